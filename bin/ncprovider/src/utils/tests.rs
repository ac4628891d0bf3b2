use std::{
  collections::{BTreeMap, HashMap},
  path::{Path, PathBuf},
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
  },
  time::Duration,
};

use async_trait::async_trait;
use futures::channel::mpsc;
use k8s_openapi::api::{
  apps::v1::Deployment,
  core::v1::{ConfigMap, Namespace, Service},
  networking::v1::Ingress,
};
use tokio::sync::mpsc as status_mpsc;

use ncp_error::io::{IoError, IoResult};
use ncp_stubs::{
  config::DaemonConfig,
  job::JobStatusEvent,
  system::NodeResource,
  space::{
    Space, SpaceActiveOrder, SpaceData, SpaceFile, SpaceHardware, SpaceJson,
    SpaceOwner,
  },
  workload::ContainerSpec,
};

use crate::{
  models::{
    BuiltImage, Capabilities, ClusterApi, KeyEventStream,
    KeyspaceNotification, LeaseStore, SystemState, TeardownPolicy,
    WorkloadBuilder, WorkloadSource, WorkloadSourceKind,
  },
  vars,
};

/// Set the log level to info and build a test env logger for tests purpose
pub fn before() {
  if std::env::var("LOG_LEVEL").is_err() {
    std::env::set_var("LOG_LEVEL", "ncprovider=info,warn,error");
  }
  let _ = env_logger::Builder::new()
    .parse_env("LOG_LEVEL")
    .is_test(true)
    .try_init();
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
  match mutex.lock() {
    Ok(guard) => guard,
    Err(poisoned) => poisoned.into_inner(),
  }
}

fn refused() -> IoError {
  IoError::new(
    "MemStore",
    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "offline"),
  )
}

#[derive(Default)]
struct MemStoreInner {
  values: HashMap<String, (String, u64)>,
  hashes: HashMap<String, HashMap<String, String>>,
  subscribers: Vec<mpsc::UnboundedSender<IoResult<KeyspaceNotification>>>,
  writes: usize,
}

/// Expiring store kept in memory, expirations are triggered by hand
#[derive(Default)]
pub struct MemStore {
  inner: Mutex<MemStoreInner>,
  failing: AtomicBool,
}

impl MemStore {
  pub fn set_failing(&self, failing: bool) {
    self.failing.store(failing, Ordering::SeqCst);
  }

  fn check(&self) -> IoResult<()> {
    if self.failing.load(Ordering::SeqCst) {
      return Err(refused());
    }
    Ok(())
  }

  pub fn ttl(&self, key: &str) -> Option<u64> {
    lock(&self.inner).values.get(key).map(|(_, ttl)| *ttl)
  }

  pub fn value(&self, key: &str) -> Option<String> {
    lock(&self.inner).values.get(key).map(|(value, _)| value.clone())
  }

  pub fn has_hash(&self, key: &str) -> bool {
    lock(&self.inner).hashes.contains_key(key)
  }

  /// Number of mutations applied to the store
  pub fn writes(&self) -> usize {
    lock(&self.inner).writes
  }

  pub fn subscribers(&self) -> usize {
    lock(&self.inner).subscribers.len()
  }

  /// Push a raw message to every subscriber
  pub fn notify(&self, channel: &str, payload: &str) {
    let mut inner = lock(&self.inner);
    inner.subscribers.retain(|tx| {
      tx.unbounded_send(Ok(KeyspaceNotification {
        channel: channel.to_owned(),
        payload: payload.to_owned(),
      }))
      .is_ok()
    });
  }

  /// Expire a key as the server would, notifying subscribers
  pub fn expire(&self, key: &str) {
    lock(&self.inner).values.remove(key);
    self.notify(&format!("__keyevent@{}__:expired", self.db()), key);
  }
}

#[async_trait(?Send)]
impl LeaseStore for MemStore {
  fn db(&self) -> i64 {
    0
  }

  async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> IoResult<()> {
    self.check()?;
    let mut inner = lock(&self.inner);
    inner.values.insert(key.to_owned(), (value.to_owned(), ttl));
    inner.writes += 1;
    Ok(())
  }

  async fn hset(&self, key: &str, fields: &[(&str, String)]) -> IoResult<()> {
    self.check()?;
    let mut inner = lock(&self.inner);
    let hash = inner.hashes.entry(key.to_owned()).or_default();
    for (field, value) in fields {
      hash.insert((*field).to_owned(), value.clone());
    }
    inner.writes += 1;
    Ok(())
  }

  async fn hmget(
    &self,
    key: &str,
    fields: &[&str],
  ) -> IoResult<Vec<Option<String>>> {
    self.check()?;
    let inner = lock(&self.inner);
    let hash = inner.hashes.get(key);
    Ok(
      fields
        .iter()
        .map(|field| hash.and_then(|hash| hash.get(*field).cloned()))
        .collect(),
    )
  }

  async fn del(&self, key: &str) -> IoResult<()> {
    self.check()?;
    let mut inner = lock(&self.inner);
    inner.values.remove(key);
    inner.hashes.remove(key);
    inner.writes += 1;
    Ok(())
  }

  async fn subscribe_expired(&self) -> IoResult<KeyEventStream> {
    self.check()?;
    let (tx, rx) = mpsc::unbounded();
    lock(&self.inner).subscribers.push(tx);
    Ok(Box::pin(rx))
  }
}

#[derive(Default)]
struct MemClusterInner {
  namespaces: HashMap<String, Namespace>,
  deployments: HashMap<(String, String), Deployment>,
  services: HashMap<(String, String), Service>,
  ingresses: HashMap<(String, String), Ingress>,
  config_maps: HashMap<(String, String), ConfigMap>,
  /// Workloads with pods, keyed by namespace and workload id
  pods: HashMap<(String, String), usize>,
  calls: Vec<String>,
}

/// Cluster kept in memory recording every call
#[derive(Default)]
pub struct MemCluster {
  inner: Mutex<MemClusterInner>,
  /// Pods survive deletion requests
  pub sticky_pods: AtomicBool,
  /// Operation failing with a non recoverable error
  pub failing_op: Mutex<Option<String>>,
  pub pod_polls: AtomicUsize,
  /// Reported by `node_resources`
  pub nodes: Mutex<Vec<NodeResource>>,
}

fn key(namespace: &str, name: &str) -> (String, String) {
  (namespace.to_owned(), name.to_owned())
}

fn not_found(kind: &str, namespace: &str, name: &str) -> IoError {
  IoError::not_found(kind, format!("{namespace}/{name} not found"))
}

fn workload_of(labels: &Option<BTreeMap<String, String>>) -> String {
  labels
    .as_ref()
    .and_then(|labels| labels.get(vars::WORKLOAD_LABEL).cloned())
    .unwrap_or_default()
}

impl MemCluster {
  fn record(&self, call: String) -> IoResult<()> {
    let op = call.split_whitespace().next().unwrap_or_default().to_owned();
    lock(&self.inner).calls.push(call);
    if lock(&self.failing_op).as_deref() == Some(op.as_str()) {
      return Err(IoError::invalid_data(
        "MemCluster",
        format!("{op} rejected"),
      ));
    }
    Ok(())
  }

  pub fn fail_on(&self, op: &str) {
    *lock(&self.failing_op) = Some(op.to_owned());
  }

  pub fn recover(&self) {
    *lock(&self.failing_op) = None;
  }

  pub fn calls(&self) -> Vec<String> {
    lock(&self.inner).calls.clone()
  }

  pub fn clear_calls(&self) {
    lock(&self.inner).calls.clear();
  }

  pub fn namespace(&self, name: &str) -> Option<Namespace> {
    lock(&self.inner).namespaces.get(name).cloned()
  }

  pub fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
    lock(&self.inner)
      .deployments
      .get(&key(namespace, name))
      .cloned()
  }

  pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
    lock(&self.inner).services.get(&key(namespace, name)).cloned()
  }

  pub fn ingress(&self, namespace: &str, name: &str) -> Option<Ingress> {
    lock(&self.inner).ingresses.get(&key(namespace, name)).cloned()
  }

  pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
    lock(&self.inner)
      .config_maps
      .get(&key(namespace, name))
      .cloned()
  }

  pub fn object_count(&self) -> usize {
    let inner = lock(&self.inner);
    inner.deployments.len()
      + inner.services.len()
      + inner.ingresses.len()
      + inner.config_maps.len()
      + inner.pods.len()
  }

  pub fn add_pods(&self, namespace: &str, workload_uuid: &str) {
    lock(&self.inner)
      .pods
      .insert(key(namespace, workload_uuid), 1);
  }
}

#[async_trait(?Send)]
impl ClusterApi for MemCluster {
  async fn get_namespace(&self, name: &str) -> IoResult<Namespace> {
    self.record(format!("get_namespace {name}"))?;
    self
      .namespace(name)
      .ok_or_else(|| not_found("Namespace", "", name))
  }

  async fn create_namespace(&self, namespace: &Namespace) -> IoResult<()> {
    let name = namespace.metadata.name.clone().unwrap_or_default();
    self.record(format!("create_namespace {name}"))?;
    let mut inner = lock(&self.inner);
    if inner.namespaces.contains_key(&name) {
      return Err(IoError::already_exists("Namespace", &name));
    }
    inner.namespaces.insert(name, namespace.clone());
    Ok(())
  }

  async fn create_deployment(
    &self,
    namespace: &str,
    deployment: &Deployment,
  ) -> IoResult<()> {
    let name = deployment.metadata.name.clone().unwrap_or_default();
    self.record(format!("create_deployment {namespace}/{name}"))?;
    let workload = deployment
      .spec
      .as_ref()
      .and_then(|spec| spec.template.metadata.as_ref())
      .map(|meta| workload_of(&meta.labels))
      .unwrap_or_default();
    let mut inner = lock(&self.inner);
    let id = key(namespace, &name);
    if inner.deployments.contains_key(&id) {
      return Err(IoError::already_exists("Deployment", &name));
    }
    inner.deployments.insert(id, deployment.clone());
    inner.pods.insert(key(namespace, &workload), 1);
    Ok(())
  }

  async fn delete_deployment(
    &self,
    namespace: &str,
    name: &str,
  ) -> IoResult<()> {
    self.record(format!("delete_deployment {namespace}/{name}"))?;
    lock(&self.inner)
      .deployments
      .remove(&key(namespace, name))
      .map(|_| ())
      .ok_or_else(|| not_found("Deployment", namespace, name))
  }

  async fn create_service(
    &self,
    namespace: &str,
    service: &Service,
  ) -> IoResult<()> {
    let name = service.metadata.name.clone().unwrap_or_default();
    self.record(format!("create_service {namespace}/{name}"))?;
    lock(&self.inner)
      .services
      .insert(key(namespace, &name), service.clone());
    Ok(())
  }

  async fn delete_service(&self, namespace: &str, name: &str) -> IoResult<()> {
    self.record(format!("delete_service {namespace}/{name}"))?;
    lock(&self.inner)
      .services
      .remove(&key(namespace, name))
      .map(|_| ())
      .ok_or_else(|| not_found("Service", namespace, name))
  }

  async fn create_ingress(
    &self,
    namespace: &str,
    ingress: &Ingress,
  ) -> IoResult<()> {
    let name = ingress.metadata.name.clone().unwrap_or_default();
    self.record(format!("create_ingress {namespace}/{name}"))?;
    lock(&self.inner)
      .ingresses
      .insert(key(namespace, &name), ingress.clone());
    Ok(())
  }

  async fn delete_ingress(&self, namespace: &str, name: &str) -> IoResult<()> {
    self.record(format!("delete_ingress {namespace}/{name}"))?;
    lock(&self.inner)
      .ingresses
      .remove(&key(namespace, name))
      .map(|_| ())
      .ok_or_else(|| not_found("Ingress", namespace, name))
  }

  async fn create_config_map(
    &self,
    namespace: &str,
    config_map: &ConfigMap,
  ) -> IoResult<()> {
    let name = config_map.metadata.name.clone().unwrap_or_default();
    self.record(format!("create_config_map {namespace}/{name}"))?;
    lock(&self.inner)
      .config_maps
      .insert(key(namespace, &name), config_map.clone());
    Ok(())
  }

  async fn delete_config_maps(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<()> {
    self.record(format!("delete_config_maps {namespace}/{workload_uuid}"))?;
    lock(&self.inner).config_maps.retain(|(ns, _), config_map| {
      ns != namespace || workload_of(&config_map.metadata.labels) != workload_uuid
    });
    Ok(())
  }

  async fn has_pods(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<bool> {
    self.pod_polls.fetch_add(1, Ordering::SeqCst);
    Ok(
      lock(&self.inner)
        .pods
        .contains_key(&key(namespace, workload_uuid)),
    )
  }

  async fn delete_replica_sets(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<()> {
    self.record(format!("delete_replica_sets {namespace}/{workload_uuid}"))
  }

  async fn delete_pods(
    &self,
    namespace: &str,
    workload_uuid: &str,
  ) -> IoResult<()> {
    self.record(format!("delete_pods {namespace}/{workload_uuid}"))?;
    if !self.sticky_pods.load(Ordering::SeqCst) {
      lock(&self.inner).pods.remove(&key(namespace, workload_uuid));
    }
    Ok(())
  }

  async fn get_container_images(
    &self,
    namespace: &str,
    deployment: &str,
  ) -> IoResult<Vec<String>> {
    self.record(format!("get_container_images {namespace}/{deployment}"))?;
    let deployment = self
      .deployment(namespace, deployment)
      .ok_or_else(|| not_found("Deployment", namespace, deployment))?;
    Ok(
      deployment
        .spec
        .and_then(|spec| spec.template.spec)
        .map(|spec| {
          spec
            .containers
            .into_iter()
            .filter_map(|container| container.image)
            .collect()
        })
        .unwrap_or_default(),
    )
  }

  async fn node_resources(&self) -> IoResult<Vec<NodeResource>> {
    self.record("node_resources".to_owned())?;
    Ok(lock(&self.nodes).clone())
  }
}

/// Builder returning preset results
pub struct FakeBuilder {
  pub kind: Mutex<WorkloadSourceKind>,
  pub containers: Mutex<Vec<ContainerSpec>>,
  pub port: i32,
  /// Panic while building to simulate a fault
  pub panic_on_build: AtomicBool,
  pub removed: Mutex<Vec<String>>,
}

impl Default for FakeBuilder {
  fn default() -> Self {
    Self {
      kind: Mutex::new(WorkloadSourceKind::Image(PathBuf::from("/tmp/build"))),
      containers: Mutex::new(Vec::new()),
      port: 8080,
      panic_on_build: AtomicBool::new(false),
      removed: Mutex::new(Vec::new()),
    }
  }
}

impl FakeBuilder {
  pub fn set_manifest(&self, path: &Path, containers: Vec<ContainerSpec>) {
    *lock(&self.kind) = WorkloadSourceKind::Manifest(path.to_owned());
    *lock(&self.containers) = containers;
  }

  pub fn removed(&self) -> Vec<String> {
    lock(&self.removed).clone()
  }
}

#[async_trait(?Send)]
impl WorkloadBuilder for FakeBuilder {
  async fn resolve_workload(
    &self,
    _workload_uuid: &str,
    _files: &[SpaceFile],
  ) -> IoResult<WorkloadSourceKind> {
    Ok(lock(&self.kind).clone())
  }

  async fn build_image(
    &self,
    job_uuid: &str,
    workload_uuid: &str,
    name: &str,
    context: &Path,
  ) -> IoResult<BuiltImage> {
    if self.panic_on_build.load(Ordering::SeqCst) {
      panic!("builder crashed");
    }
    Ok(BuiltImage {
      image: format!("ncprovider/{name}-{workload_uuid}:{job_uuid}"),
      dockerfile_path: context.join("Dockerfile"),
    })
  }

  async fn extract_exposed_port(&self, _dockerfile_path: &Path) -> IoResult<i32> {
    Ok(self.port)
  }

  async fn parse_manifest(&self, _path: &Path) -> IoResult<Vec<ContainerSpec>> {
    Ok(lock(&self.containers).clone())
  }

  async fn remove_image(&self, image_id: &str) -> IoResult<()> {
    lock(&self.removed).push(image_id.to_owned());
    Ok(())
  }
}

/// Workload documents served from memory
#[derive(Default)]
pub struct FakeSource {
  pub spaces: Mutex<HashMap<String, SpaceJson>>,
  pub hosts: Mutex<HashMap<String, String>>,
}

impl FakeSource {
  pub fn add_space(&self, uri: &str, space: SpaceJson) {
    lock(&self.spaces).insert(uri.to_owned(), space);
  }

  pub fn add_host(&self, uri: &str, host: &str) {
    lock(&self.hosts).insert(uri.to_owned(), host.to_owned());
  }
}

#[async_trait(?Send)]
impl WorkloadSource for FakeSource {
  async fn fetch_space(&self, uri: &str) -> IoResult<SpaceJson> {
    lock(&self.spaces)
      .get(uri)
      .cloned()
      .ok_or_else(|| IoError::invalid_data("Source", format!("{uri} 404")))
  }

  async fn fetch_result_host(&self, uri: &str) -> IoResult<String> {
    lock(&self.hosts)
      .get(uri)
      .cloned()
      .ok_or_else(|| IoError::invalid_data("Source", format!("{uri} 404")))
  }
}

pub fn gen_space(
  uuid: &str,
  wallet: &str,
  name: &str,
  description: &str,
) -> SpaceJson {
  SpaceJson {
    data: SpaceData {
      files: vec![SpaceFile {
        name: format!("{name}/Dockerfile"),
        url: format!("https://files.test/{uuid}/Dockerfile"),
      }],
      owner: SpaceOwner {
        public_address: wallet.to_owned(),
      },
      space: Space {
        name: name.to_owned(),
        uuid: uuid.to_owned(),
        active_order: SpaceActiveOrder {
          config: SpaceHardware {
            description: description.to_owned(),
            ..Default::default()
          },
        },
      },
    },
    message: "success".to_owned(),
    status: "success".to_owned(),
  }
}

pub struct TestSystem {
  pub state: SystemState,
  pub status_rx: status_mpsc::Receiver<JobStatusEvent>,
  pub cluster: Arc<MemCluster>,
  pub store: Arc<MemStore>,
  pub builder: Arc<FakeBuilder>,
  pub source: Arc<FakeSource>,
}

/// Start a test http server serving the routes of the daemon
pub fn gen_server(state: SystemState) -> ntex::web::test::TestServer {
  ntex::web::test::server(move || {
    ntex::web::App::new()
      .state(state.clone())
      .configure(crate::services::ntex_config)
      .default_service(ntex::web::route().to(crate::services::unhandled))
  })
}

/// Generate a system state backed by in memory collaborators
pub fn gen_test_system() -> TestSystem {
  before();
  let state_dir = std::env::temp_dir()
    .join(format!("ncprovider-test-{}", uuid::Uuid::new_v4()))
    .display()
    .to_string();
  let config = DaemonConfig {
    state_dir,
    redis_url: "redis://127.0.0.1:6379/0".to_owned(),
    domain: ".provider.test".to_owned(),
    hostname: "test-node".to_owned(),
    ..Default::default()
  };
  let cluster = Arc::new(MemCluster::default());
  let store = Arc::new(MemStore::default());
  let builder = Arc::new(FakeBuilder::default());
  let source = Arc::new(FakeSource::default());
  let capabilities = Capabilities {
    cluster: cluster.clone(),
    builder: builder.clone(),
    source: source.clone(),
    store: store.clone(),
  };
  let (mut state, status_rx) = SystemState::from_parts(&config, capabilities);
  state.teardown_policy = TeardownPolicy {
    interval: Duration::from_millis(5),
    attempts: 20,
  };
  TestSystem {
    state,
    status_rx,
    cluster,
    store,
    builder,
    source,
  }
}
