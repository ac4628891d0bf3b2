use async_trait::async_trait;
use k8s_openapi::api::{
  apps::v1::Deployment,
  core::v1::{ConfigMap, Namespace, Service},
  networking::v1::Ingress,
};

use ncp_error::io::IoResult;
use ncp_stubs::system::NodeResource;

/// Orchestration api consumed by the deployment and teardown flows.
/// A missing object is reported as a `NotFound` error.
#[async_trait(?Send)]
pub trait ClusterApi: Send + Sync {
  async fn get_namespace(&self, name: &str) -> IoResult<Namespace>;

  async fn create_namespace(&self, namespace: &Namespace) -> IoResult<()>;

  async fn create_deployment(
    &self,
    namespace: &str,
    deployment: &Deployment,
  ) -> IoResult<()>;

  async fn delete_deployment(&self, namespace: &str, name: &str)
    -> IoResult<()>;

  async fn create_service(
    &self,
    namespace: &str,
    service: &Service,
  ) -> IoResult<()>;

  async fn delete_service(&self, namespace: &str, name: &str) -> IoResult<()>;

  async fn create_ingress(
    &self,
    namespace: &str,
    ingress: &Ingress,
  ) -> IoResult<()>;

  async fn delete_ingress(&self, namespace: &str, name: &str) -> IoResult<()>;

  async fn create_config_map(
    &self,
    namespace: &str,
    config_map: &ConfigMap,
  ) -> IoResult<()>;

  /// Delete config maps labelled with the workload id
  async fn delete_config_maps(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<()>;

  /// Whether any pod labelled with the workload id still exists
  async fn has_pods(&self, namespace: &str, workload_uuid: &str)
    -> IoResult<bool>;

  async fn delete_replica_sets(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<()>;

  async fn delete_pods(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<()>;

  /// Image ids of the containers of a deployment
  async fn get_container_images(
    &self,
    namespace: &str,
    deployment: &str,
  ) -> IoResult<Vec<String>>;

  /// Allocatable capacity of every node and the requests of its pods
  async fn node_resources(&self) -> IoResult<Vec<NodeResource>>;
}
