use ntex::web;

use ncp_error::http::HttpError;
use ncp_stubs::system::HostInfo;

use crate::{models::SystemState, utils, version};

#[web::get("/info")]
async fn get_info(
  state: web::types::State<SystemState>,
) -> Result<web::HttpResponse, HttpError> {
  let cpu_cores = std::thread::available_parallelism()
    .map(|count| count.get())
    .unwrap_or(1);
  let info = HostInfo {
    node_name: state.config.hostname.clone(),
    operating_system: std::env::consts::OS.to_owned(),
    architecture: version::ARCH.to_owned(),
    cpu_cores,
    version: state.version.clone(),
    gpu_usage: state.gpu_pool.snapshot(),
  };
  Ok(web::HttpResponse::Ok().json(&info))
}

/// Node id, region and resource statistics of the cluster
#[web::get("/resources")]
async fn get_resources(
  state: web::types::State<SystemState>,
) -> Result<web::HttpResponse, HttpError> {
  let resources = utils::cluster_resource::collect(&state).await?;
  Ok(web::HttpResponse::Ok().json(&resources))
}

pub fn ntex_config(config: &mut web::ServiceConfig) {
  config.service(get_info);
  config.service(get_resources);
}
