use async_trait::async_trait;

use ncp_error::io::IoResult;
use ncp_stubs::space::SpaceJson;

/// Remote documents describing workloads
#[async_trait(?Send)]
pub trait WorkloadSource: Send + Sync {
  /// Fetch the workload document served at the job source uri
  async fn fetch_space(&self, uri: &str) -> IoResult<SpaceJson>;

  /// Recover the host a previous run was routed to
  async fn fetch_result_host(&self, uri: &str) -> IoResult<String>;
}
