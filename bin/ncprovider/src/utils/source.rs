use async_trait::async_trait;
use ntex::http::client::{Client, ClientResponse};

use ncp_error::io::{FromIo, IoError, IoResult};
use ncp_stubs::space::{JobResultHost, SpaceJson};

use crate::models::WorkloadSource;

const MAX_DOCUMENT_SIZE: usize = 8 * 1024 * 1024;

/// Workload documents fetched over http
#[derive(Default)]
pub struct HttpSource;

/// Host part of a result url, without scheme nor trailing slash
pub fn strip_scheme(uri: &str) -> String {
  let uri = uri.trim();
  let host = uri
    .strip_prefix("https://")
    .or_else(|| uri.strip_prefix("http://"))
    .unwrap_or(uri);
  host.trim_end_matches('/').to_owned()
}

impl HttpSource {
  pub fn new() -> Self {
    Self
  }

  async fn get(&self, uri: &str) -> IoResult<ClientResponse> {
    let client = Client::build()
      .timeout(ntex::time::Millis::from_secs(30))
      .finish();
    let res = client
      .get(uri)
      .header("Accept", "application/json")
      .send()
      .await
      .map_err(|err| err.map_err_context(|| uri.to_owned()))?;
    if !res.status().is_success() {
      return Err(IoError::invalid_data(
        "Source",
        format!("{uri} responded {}", res.status()),
      ));
    }
    Ok(res)
  }
}

#[async_trait(?Send)]
impl WorkloadSource for HttpSource {
  async fn fetch_space(&self, uri: &str) -> IoResult<SpaceJson> {
    let mut res = self.get(uri).await?;
    let space = res
      .json::<SpaceJson>()
      .limit(MAX_DOCUMENT_SIZE)
      .await
      .map_err(|err| err.map_err_context(|| uri.to_owned()))?;
    log::debug!("source::fetch_space: {uri} status {}", space.status);
    Ok(space)
  }

  async fn fetch_result_host(&self, uri: &str) -> IoResult<String> {
    let mut res = self.get(uri).await?;
    let result = res
      .json::<JobResultHost>()
      .limit(MAX_DOCUMENT_SIZE)
      .await
      .map_err(|err| err.map_err_context(|| uri.to_owned()))?;
    Ok(strip_scheme(&result.job_result_uri))
  }
}
