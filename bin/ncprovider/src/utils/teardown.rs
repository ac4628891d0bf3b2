use ncp_error::io::IoResult;

use crate::{
  models::{ClusterApi, SystemState, TeardownPolicy, WorkloadBuilder},
  utils::deployment,
};

/// A missing object counts as deleted
fn tolerate(res: IoResult<()>) -> IoResult<()> {
  match res {
    Err(err) if err.is_not_found() => Ok(()),
    res => res,
  }
}

/// Remove every cluster object of a workload
pub async fn run(
  namespace: &str,
  workload_uuid: &str,
  state: &SystemState,
) -> IoResult<()> {
  run_keeping(namespace, workload_uuid, &[], state).await
}

/// Remove every cluster object of a workload, images listed in `keep` stay
/// in the local store
pub async fn run_keeping(
  namespace: &str,
  workload_uuid: &str,
  keep: &[String],
  state: &SystemState,
) -> IoResult<()> {
  run_with(
    state.cluster.as_ref(),
    state.builder.as_ref(),
    &state.teardown_policy,
    namespace,
    workload_uuid,
    keep,
  )
  .await
}

/// Delete the ingress, the service, the images, the deployment, its replica
/// sets and pods, then the config maps. Finish by waiting for the pods to
/// disappear, at most `policy.attempts` polls.
pub async fn run_with(
  cluster: &dyn ClusterApi,
  builder: &dyn WorkloadBuilder,
  policy: &TeardownPolicy,
  namespace: &str,
  workload_uuid: &str,
  keep: &[String],
) -> IoResult<()> {
  log::debug!("teardown::run: {namespace}/{workload_uuid}");
  tolerate(
    cluster
      .delete_ingress(namespace, &deployment::ingress_name(workload_uuid))
      .await,
  )?;
  tolerate(
    cluster
      .delete_service(namespace, &deployment::service_name(workload_uuid))
      .await,
  )?;
  let deployment_name = deployment::deployment_name(workload_uuid);
  match cluster
    .get_container_images(namespace, &deployment_name)
    .await
  {
    Ok(images) => {
      for image in images.iter().filter(|image| !keep.contains(*image)) {
        if let Err(err) = builder.remove_image(image).await {
          log::warn!("teardown::run: unable to remove image {image}: {err}");
        }
      }
    }
    Err(err) if err.is_not_found() => {}
    Err(err) => return Err(err),
  }
  tolerate(cluster.delete_deployment(namespace, &deployment_name).await)?;
  tolerate(cluster.delete_replica_sets(namespace, workload_uuid).await)?;
  tolerate(cluster.delete_pods(namespace, workload_uuid).await)?;
  tolerate(cluster.delete_config_maps(namespace, workload_uuid).await)?;
  if !wait_pods(cluster, policy, namespace, workload_uuid).await {
    log::warn!(
      "teardown::run: pods of {workload_uuid} still present after {} polls",
      policy.attempts
    );
  }
  log::info!("teardown::run: {namespace}/{workload_uuid} removed");
  Ok(())
}

async fn wait_pods(
  cluster: &dyn ClusterApi,
  policy: &TeardownPolicy,
  namespace: &str,
  workload_uuid: &str,
) -> bool {
  for _ in 0..policy.attempts {
    ntex::time::sleep(policy.interval).await;
    match cluster.has_pods(namespace, workload_uuid).await {
      Ok(false) => return true,
      Ok(true) => {}
      Err(err) => {
        log::warn!("teardown::wait_pods: {err}");
      }
    }
  }
  false
}
