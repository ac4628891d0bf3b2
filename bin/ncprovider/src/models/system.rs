use std::sync::Arc;

use tokio::sync::mpsc;

use ncp_error::io::IoResult;
use ncp_stubs::{config::DaemonConfig, job::JobStatusEvent};

use crate::{utils, vars, version};

use super::{
  ClusterApi, GpuPool, JobStatusPublisher, JobStore, LeaseStore, LeaseTracker,
  TaskQueue, TeardownPolicy, WorkloadBuilder, WorkloadSource,
};

/// External collaborators the daemon works with
#[derive(Clone)]
pub struct Capabilities {
  pub cluster: Arc<dyn ClusterApi>,
  pub builder: Arc<dyn WorkloadBuilder>,
  pub source: Arc<dyn WorkloadSource>,
  pub store: Arc<dyn LeaseStore>,
}

/// This structure represent the state of the system.
/// Used to share the state between the different handlers and tasks.
#[derive(Clone)]
pub struct SystemState {
  /// The config of the daemon
  pub config: DaemonConfig,
  /// Orchestration api of the cluster running workloads
  pub cluster: Arc<dyn ClusterApi>,
  /// Image builder
  pub builder: Arc<dyn WorkloadBuilder>,
  /// Remote workload documents
  pub source: Arc<dyn WorkloadSource>,
  /// Leases of running jobs
  pub lease: LeaseTracker,
  /// Accelerator usage of deploys in progress
  pub gpu_pool: GpuPool,
  /// Job status transitions
  pub status: JobStatusPublisher,
  /// Persisted job records
  pub jobs: JobStore,
  /// Running tasks
  pub task_queue: TaskQueue,
  pub teardown_policy: TeardownPolicy,
  /// Version of the daemon
  pub version: String,
}

impl SystemState {
  /// Create the state from its collaborators.
  /// The returned receiver yields every published status transition.
  pub fn from_parts(
    conf: &DaemonConfig,
    capabilities: Capabilities,
  ) -> (Self, mpsc::Receiver<JobStatusEvent>) {
    let (status, rx) = JobStatusPublisher::new(vars::STATUS_CHANNEL_SIZE);
    let state = SystemState {
      config: conf.to_owned(),
      cluster: capabilities.cluster,
      builder: capabilities.builder,
      source: capabilities.source,
      lease: LeaseTracker::new(capabilities.store),
      gpu_pool: GpuPool::new(),
      status,
      jobs: JobStore::new(&conf.state_dir),
      task_queue: TaskQueue::new(),
      teardown_policy: TeardownPolicy::default(),
      version: version::VERSION.to_owned(),
    };
    (state, rx)
  }

  /// Connect to the cluster, the lease store and the docker daemon
  pub async fn new(
    conf: &DaemonConfig,
  ) -> IoResult<(Self, mpsc::Receiver<JobStatusEvent>)> {
    let cluster = utils::kube::KubeCluster::new(conf).await?;
    let store = utils::store::RedisStore::new(&conf.redis_url).await?;
    let builder = utils::docker::DockerBuilder::new(conf)?;
    let capabilities = Capabilities {
      cluster: Arc::new(cluster),
      builder: Arc::new(builder),
      source: Arc::new(utils::source::HttpSource::new()),
      store: Arc::new(store),
    };
    Ok(Self::from_parts(conf, capabilities))
  }
}
