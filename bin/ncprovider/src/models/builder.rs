use std::path::PathBuf;

use async_trait::async_trait;

use ncp_error::io::IoResult;
use ncp_stubs::{space::SpaceFile, workload::ContainerSpec};

/// Where the build inputs of a workload were found
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkloadSourceKind {
  /// Path of the manifest file
  Manifest(PathBuf),
  /// Directory holding the Dockerfile
  Image(PathBuf),
}

/// Image built from a Dockerfile
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltImage {
  pub image: String,
  pub dockerfile_path: PathBuf,
}

/// Image building collaborator
#[async_trait(?Send)]
pub trait WorkloadBuilder: Send + Sync {
  async fn resolve_workload(
    &self,
    workload_uuid: &str,
    files: &[SpaceFile],
  ) -> IoResult<WorkloadSourceKind>;

  async fn build_image(
    &self,
    job_uuid: &str,
    workload_uuid: &str,
    name: &str,
    context: &std::path::Path,
  ) -> IoResult<BuiltImage>;

  async fn extract_exposed_port(
    &self,
    dockerfile_path: &std::path::Path,
  ) -> IoResult<i32>;

  async fn parse_manifest(
    &self,
    path: &std::path::Path,
  ) -> IoResult<Vec<ContainerSpec>>;

  async fn remove_image(&self, image_id: &str) -> IoResult<()>;
}
