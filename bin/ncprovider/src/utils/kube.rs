use async_trait::async_trait;
use k8s_openapi::api::{
  apps::v1::{Deployment, ReplicaSet},
  core::v1::{ConfigMap, Namespace, Node, Pod, Service},
  networking::v1::Ingress,
};
use kube::{
  api::{Api, DeleteParams, ListParams, PostParams},
  config::{KubeConfigOptions, Kubeconfig},
  Client, Config,
};

use ncp_error::io::{FromIo, IoError, IoResult};
use ncp_stubs::{config::DaemonConfig, system::NodeResource};

use crate::{models::ClusterApi, utils, vars};

/// Pods holding node resources, finished pods release theirs
const ACTIVE_PODS: &str = "status.phase!=Succeeded,status.phase!=Failed";

/// Cluster reached through the kubernetes api
pub struct KubeCluster {
  client: Client,
}

fn selector(workload_uuid: &str) -> ListParams {
  ListParams::default().labels(&format!("{}={workload_uuid}", vars::WORKLOAD_LABEL))
}

impl KubeCluster {
  /// Connect with `kubeconfig` when set, otherwise infer the config
  pub async fn new(conf: &DaemonConfig) -> IoResult<Self> {
    let config = match &conf.kubeconfig {
      Some(path) => {
        let kubeconfig = Kubeconfig::read_from(path).map_err(|err| {
          IoError::invalid_input("Kubeconfig", format!("{path}: {err}"))
        })?;
        Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
          .await
          .map_err(|err| {
            IoError::invalid_input("Kubeconfig", format!("{path}: {err}"))
          })?
      }
      None => Config::infer().await.map_err(|err| {
        IoError::invalid_input("Kubeconfig", format!("unable to infer: {err}"))
      })?,
    };
    log::debug!("kube::new: cluster url {}", config.cluster_url);
    let client = Client::try_from(config)
      .map_err(|err| err.map_err_context(|| "KubeClient"))?;
    Ok(Self { client })
  }

  fn api<K>(&self, namespace: &str) -> Api<K>
  where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as kube::Resource>::DynamicType: Default,
  {
    Api::namespaced(self.client.clone(), namespace)
  }
}

#[async_trait(?Send)]
impl ClusterApi for KubeCluster {
  async fn get_namespace(&self, name: &str) -> IoResult<Namespace> {
    let api: Api<Namespace> = Api::all(self.client.clone());
    let namespace = api
      .get(name)
      .await
      .map_err(|err| err.map_err_context(|| format!("Namespace {name}")))?;
    Ok(namespace)
  }

  async fn create_namespace(&self, namespace: &Namespace) -> IoResult<()> {
    let api: Api<Namespace> = Api::all(self.client.clone());
    api
      .create(&PostParams::default(), namespace)
      .await
      .map_err(|err| err.map_err_context(|| "Namespace"))?;
    Ok(())
  }

  async fn create_deployment(
    &self,
    namespace: &str,
    deployment: &Deployment,
  ) -> IoResult<()> {
    self
      .api::<Deployment>(namespace)
      .create(&PostParams::default(), deployment)
      .await
      .map_err(|err| err.map_err_context(|| "Deployment"))?;
    Ok(())
  }

  async fn delete_deployment(
    &self,
    namespace: &str,
    name: &str,
  ) -> IoResult<()> {
    self
      .api::<Deployment>(namespace)
      .delete(name, &DeleteParams::default())
      .await
      .map_err(|err| err.map_err_context(|| format!("Deployment {name}")))?;
    Ok(())
  }

  async fn create_service(
    &self,
    namespace: &str,
    service: &Service,
  ) -> IoResult<()> {
    self
      .api::<Service>(namespace)
      .create(&PostParams::default(), service)
      .await
      .map_err(|err| err.map_err_context(|| "Service"))?;
    Ok(())
  }

  async fn delete_service(&self, namespace: &str, name: &str) -> IoResult<()> {
    self
      .api::<Service>(namespace)
      .delete(name, &DeleteParams::default())
      .await
      .map_err(|err| err.map_err_context(|| format!("Service {name}")))?;
    Ok(())
  }

  async fn create_ingress(
    &self,
    namespace: &str,
    ingress: &Ingress,
  ) -> IoResult<()> {
    self
      .api::<Ingress>(namespace)
      .create(&PostParams::default(), ingress)
      .await
      .map_err(|err| err.map_err_context(|| "Ingress"))?;
    Ok(())
  }

  async fn delete_ingress(&self, namespace: &str, name: &str) -> IoResult<()> {
    self
      .api::<Ingress>(namespace)
      .delete(name, &DeleteParams::default())
      .await
      .map_err(|err| err.map_err_context(|| format!("Ingress {name}")))?;
    Ok(())
  }

  async fn create_config_map(
    &self,
    namespace: &str,
    config_map: &ConfigMap,
  ) -> IoResult<()> {
    self
      .api::<ConfigMap>(namespace)
      .create(&PostParams::default(), config_map)
      .await
      .map_err(|err| err.map_err_context(|| "ConfigMap"))?;
    Ok(())
  }

  async fn delete_config_maps(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<()> {
    self
      .api::<ConfigMap>(namespace)
      .delete_collection(&DeleteParams::default(), &selector(workload_uuid))
      .await
      .map_err(|err| err.map_err_context(|| "ConfigMap"))?;
    Ok(())
  }

  async fn has_pods(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<bool> {
    let pods = self
      .api::<Pod>(namespace)
      .list(&selector(workload_uuid).limit(1))
      .await
      .map_err(|err| err.map_err_context(|| "Pod"))?;
    Ok(!pods.items.is_empty())
  }

  async fn delete_replica_sets(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<()> {
    self
      .api::<ReplicaSet>(namespace)
      .delete_collection(&DeleteParams::default(), &selector(workload_uuid))
      .await
      .map_err(|err| err.map_err_context(|| "ReplicaSet"))?;
    Ok(())
  }

  async fn delete_pods(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<()> {
    self
      .api::<Pod>(namespace)
      .delete_collection(&DeleteParams::default(), &selector(workload_uuid))
      .await
      .map_err(|err| err.map_err_context(|| "Pod"))?;
    Ok(())
  }

  async fn get_container_images(
    &self,
    namespace: &str,
    deployment: &str,
  ) -> IoResult<Vec<String>> {
    let deployment = self
      .api::<Deployment>(namespace)
      .get(deployment)
      .await
      .map_err(|err| err.map_err_context(|| format!("Deployment {deployment}")))?;
    let images = deployment
      .spec
      .and_then(|spec| spec.template.spec)
      .map(|spec| {
        spec
          .containers
          .into_iter()
          .filter_map(|container| container.image)
          .collect()
      })
      .unwrap_or_default();
    Ok(images)
  }

  async fn node_resources(&self) -> IoResult<Vec<NodeResource>> {
    let nodes = Api::<Node>::all(self.client.clone())
      .list(&ListParams::default())
      .await
      .map_err(|err| err.map_err_context(|| "Node"))?;
    let pods = Api::<Pod>::all(self.client.clone())
      .list(&ListParams::default().fields(ACTIVE_PODS))
      .await
      .map_err(|err| err.map_err_context(|| "Pod"))?;
    Ok(utils::cluster_resource::gen_node_resources(
      &nodes.items,
      &pods.items,
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn workload_selector() {
    let params = selector("space-1");
    assert_eq!(
      params.label_selector.as_deref(),
      Some("ncprovider.io/workload=space-1")
    );
  }
}
