use std::{collections::BTreeMap, path::Path};

use k8s_openapi::{
  api::{
    apps::v1::{Deployment, DeploymentSpec},
    core::v1::{
      ConfigMap, ConfigMapVolumeSource, Container, ContainerPort,
      EnvVar as K8sEnvVar, ExecAction, Namespace, PodSpec, PodTemplateSpec,
      Probe, ResourceRequirements, Service, ServicePort, ServiceSpec, Volume,
      VolumeMount as K8sVolumeMount,
    },
    networking::v1::{
      HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend,
      IngressRule, IngressServiceBackend, IngressSpec, ServiceBackendPort,
    },
  },
  apimachinery::pkg::{
    api::resource::Quantity,
    apis::meta::v1::{LabelSelector, ObjectMeta},
    util::intstr::IntOrString,
  },
};

use ncp_error::io::{FromIo, IoError, IoResult};
use ncp_stubs::{
  job::JobStatus,
  resource::{ResourceSpec, Specification},
  workload::{ContainerSpec, DependencySpec, EnvVar, ImageWorkload},
};

use crate::{
  models::{ClusterApi, SystemState},
  utils, vars,
};

/// Suffixes accepted in a resource quantity
const QUANTITY_SUFFIXES: [&str; 14] = [
  "", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "k", "M", "G", "T", "P", "E", "m",
];

/// Identity of the workload being deployed
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeployContext {
  pub job_uuid: String,
  /// Lower cased owner wallet
  pub wallet: String,
  pub workload_uuid: String,
  pub workload_name: String,
  /// Host routed to the workload
  pub host: String,
  pub ingress_class: String,
}

impl DeployContext {
  pub fn namespace(&self) -> String {
    namespace_name(&self.wallet)
  }
}

pub fn namespace_name(wallet: &str) -> String {
  format!("ns-{}", wallet.to_lowercase())
}

pub fn deployment_name(workload_uuid: &str) -> String {
  format!("deploy-{workload_uuid}")
}

pub fn service_name(workload_uuid: &str) -> String {
  format!("svc-{workload_uuid}")
}

pub fn ingress_name(workload_uuid: &str) -> String {
  format!("ing-{workload_uuid}")
}

pub fn container_name(workload_uuid: &str) -> String {
  format!("pod-{workload_uuid}")
}

pub fn workload_labels(workload_uuid: &str) -> BTreeMap<String, String> {
  BTreeMap::from([(vars::WORKLOAD_LABEL.to_owned(), workload_uuid.to_owned())])
}

fn meta(name: &str, namespace: &str, workload_uuid: &str) -> ObjectMeta {
  ObjectMeta {
    name: Some(name.to_owned()),
    namespace: Some(namespace.to_owned()),
    labels: Some(workload_labels(workload_uuid)),
    ..Default::default()
  }
}

/// Build a `<quantity><unit>` resource quantity
pub fn parse_quantity(spec: &Specification) -> IoResult<Quantity> {
  if spec.quantity <= 0 {
    return Err(IoError::invalid_input(
      "Quantity",
      format!("{}{} must be positive", spec.quantity, spec.unit),
    ));
  }
  if !QUANTITY_SUFFIXES.contains(&spec.unit.as_str()) {
    return Err(IoError::invalid_input(
      "Quantity",
      format!("unknown unit '{}'", spec.unit),
    ));
  }
  Ok(Quantity(format!("{}{}", spec.quantity, spec.unit)))
}

/// Limits equal to requests for cpu, memory, storage and accelerators.
/// CPU only workloads request no accelerator.
pub fn gen_resources(spec: &ResourceSpec) -> IoResult<ResourceRequirements> {
  if spec.cpu.quantity <= 0 {
    return Err(IoError::invalid_input(
      "Quantity",
      format!("cpu {} must be positive", spec.cpu.quantity),
    ));
  }
  let mut resources = BTreeMap::from([
    ("cpu".to_owned(), Quantity(spec.cpu.quantity.to_string())),
    ("memory".to_owned(), parse_quantity(&spec.memory)?),
    ("ephemeral-storage".to_owned(), parse_quantity(&spec.storage)?),
  ]);
  if spec.has_gpu() {
    resources.insert(
      vars::GPU_RESOURCE.to_owned(),
      Quantity(spec.gpu.quantity.to_string()),
    );
  }
  Ok(ResourceRequirements {
    limits: Some(resources.clone()),
    requests: Some(resources),
    ..Default::default()
  })
}

/// Pin pods to nodes labelled with the accelerator model
pub fn gen_node_selector(spec: &ResourceSpec) -> Option<BTreeMap<String, String>> {
  spec
    .gpu_model()
    .map(|model| BTreeMap::from([(model, "true".to_owned())]))
}

/// Rewrite callback urls to the public url of the workload
pub fn rewrite_callback_env(env: &mut [EnvVar], host: &str) {
  for var in env.iter_mut() {
    if var.name.contains(vars::CALLBACK_ENV) {
      var.value = format!("https://{host}");
    }
  }
}

fn to_k8s_env(env: &[EnvVar]) -> Vec<K8sEnvVar> {
  env
    .iter()
    .map(|var| K8sEnvVar {
      name: var.name.clone(),
      value: Some(var.value.clone()),
      ..Default::default()
    })
    .collect()
}

fn injected_env(ctx: &DeployContext) -> Vec<EnvVar> {
  vec![
    EnvVar::new("wallet_address", &ctx.wallet),
    EnvVar::new("space_uuid", &ctx.workload_uuid),
    EnvVar::new("result_url", &ctx.host),
    EnvVar::new("job_uuid", &ctx.job_uuid),
  ]
}

fn gen_ports(ports: &[i32]) -> Option<Vec<ContainerPort>> {
  if ports.is_empty() {
    return None;
  }
  Some(
    ports
      .iter()
      .map(|port| ContainerPort {
        container_port: *port,
        ..Default::default()
      })
      .collect(),
  )
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
  if values.is_empty() {
    None
  } else {
    Some(values.to_vec())
  }
}

fn gen_deployment(
  ctx: &DeployContext,
  containers: Vec<Container>,
  volumes: Option<Vec<Volume>>,
  spec: &ResourceSpec,
) -> Deployment {
  let namespace = ctx.namespace();
  let labels = workload_labels(&ctx.workload_uuid);
  Deployment {
    metadata: meta(
      &deployment_name(&ctx.workload_uuid),
      &namespace,
      &ctx.workload_uuid,
    ),
    spec: Some(DeploymentSpec {
      selector: LabelSelector {
        match_labels: Some(labels.clone()),
        ..Default::default()
      },
      template: PodTemplateSpec {
        metadata: Some(ObjectMeta {
          namespace: Some(namespace),
          labels: Some(labels),
          ..Default::default()
        }),
        spec: Some(PodSpec {
          node_selector: gen_node_selector(spec),
          containers,
          volumes,
          ..Default::default()
        }),
      },
      ..Default::default()
    }),
    ..Default::default()
  }
}

pub fn gen_namespace(wallet: &str) -> Namespace {
  Namespace {
    metadata: ObjectMeta {
      name: Some(namespace_name(wallet)),
      labels: Some(BTreeMap::from([(
        vars::WALLET_LABEL.to_owned(),
        wallet.to_lowercase(),
      )])),
      ..Default::default()
    },
    ..Default::default()
  }
}

/// Single container deployment of a built image
pub fn gen_image_deployment(
  ctx: &DeployContext,
  image: &ImageWorkload,
  spec: &ResourceSpec,
) -> IoResult<Deployment> {
  let container = Container {
    name: container_name(&ctx.workload_uuid),
    image: Some(image.image.clone()),
    image_pull_policy: Some("IfNotPresent".to_owned()),
    ports: gen_ports(&[image.exposed_port]),
    env: Some(to_k8s_env(&injected_env(ctx))),
    resources: Some(gen_resources(spec)?),
    ..Default::default()
  };
  Ok(gen_deployment(ctx, vec![container], None, spec))
}

fn gen_dependency_container(
  ctx: &DeployContext,
  dependency: &DependencySpec,
) -> Container {
  Container {
    name: format!("{}-{}", ctx.workload_uuid, dependency.name),
    image: Some(dependency.image.clone()),
    image_pull_policy: Some("IfNotPresent".to_owned()),
    command: non_empty(&dependency.command),
    args: non_empty(&dependency.args),
    env: Some(to_k8s_env(&dependency.env)),
    ports: gen_ports(&dependency.ports),
    readiness_probe: Some(Probe {
      exec: Some(ExecAction {
        command: non_empty(&dependency.ready_cmd),
      }),
      initial_delay_seconds: Some(5),
      period_seconds: Some(5),
      ..Default::default()
    }),
    ..Default::default()
  }
}

fn gen_service_container(
  ctx: &DeployContext,
  container: &ContainerSpec,
  resources: Option<ResourceRequirements>,
  volume_mounts: Option<Vec<K8sVolumeMount>>,
) -> Container {
  let mut env = container.env.clone();
  rewrite_callback_env(&mut env, &ctx.host);
  env.extend(injected_env(ctx));
  Container {
    name: format!("{}-{}", ctx.workload_uuid, container.name),
    image: Some(container.image.clone()),
    image_pull_policy: Some("IfNotPresent".to_owned()),
    command: non_empty(&container.command),
    args: non_empty(&container.args),
    env: Some(to_k8s_env(&env)),
    ports: gen_ports(&container.ports),
    resources,
    volume_mounts,
    ..Default::default()
  }
}

/// Name of the config map holding a mounted file
pub fn config_map_name(workload_uuid: &str, file_name: &str) -> String {
  let stem = Path::new(file_name)
    .file_stem()
    .map(|stem| stem.to_string_lossy().to_string())
    .unwrap_or_else(|| file_name.to_owned());
  format!("{workload_uuid}-{stem}")
}

/// Config map holding `file_name` read from `directory`
pub async fn gen_config_map(
  ctx: &DeployContext,
  directory: &Path,
  file_name: &str,
) -> IoResult<ConfigMap> {
  let path = Path::new(file_name);
  if file_name.is_empty()
    || path.is_absolute()
    || path
      .components()
      .any(|component| !matches!(component, std::path::Component::Normal(_)))
  {
    return Err(IoError::invalid_input(
      "ConfigMap",
      format!("'{file_name}' is not a file of the workload"),
    ));
  }
  let content = tokio::fs::read_to_string(directory.join(path))
    .await
    .map_err(|err| err.map_err_context(|| format!("ConfigMap {file_name}")))?;
  let data_key = path
    .file_name()
    .map(|name| name.to_string_lossy().to_string())
    .unwrap_or_else(|| file_name.to_owned());
  Ok(ConfigMap {
    metadata: meta(
      &config_map_name(&ctx.workload_uuid, file_name),
      &ctx.namespace(),
      &ctx.workload_uuid,
    ),
    data: Some(BTreeMap::from([(data_key, content)])),
    ..Default::default()
  })
}

/// Pod of a manifest: dependency containers, then the primary container
/// with the resource limits, then sidecar services.
pub fn gen_manifest_deployment(
  ctx: &DeployContext,
  containers: &[ContainerSpec],
  spec: &ResourceSpec,
  config_map: Option<&ConfigMap>,
) -> IoResult<Deployment> {
  let Some((primary, sidecars)) = containers.split_first() else {
    return Err(IoError::invalid_input(
      "Manifest",
      "at least one service is required",
    ));
  };
  let mut volumes = None;
  let mut volume_mounts = None;
  if let (Some(mount), Some(config_map)) = (&primary.volume_mount, config_map)
  {
    let config_name = config_map.metadata.name.clone().unwrap_or_default();
    let volume_name = config_map_name(&ctx.workload_uuid, &mount.name);
    volumes = Some(vec![Volume {
      name: volume_name.clone(),
      config_map: Some(ConfigMapVolumeSource {
        name: Some(config_name),
        ..Default::default()
      }),
      ..Default::default()
    }]);
    volume_mounts = Some(vec![K8sVolumeMount {
      name: volume_name,
      mount_path: mount.path.clone(),
      ..Default::default()
    }]);
  }
  let mut pod_containers = containers
    .iter()
    .flat_map(|container| container.depends.iter())
    .map(|dependency| gen_dependency_container(ctx, dependency))
    .collect::<Vec<_>>();
  pod_containers.push(gen_service_container(
    ctx,
    primary,
    Some(gen_resources(spec)?),
    volume_mounts,
  ));
  pod_containers.extend(
    sidecars
      .iter()
      .map(|sidecar| gen_service_container(ctx, sidecar, None, None)),
  );
  Ok(gen_deployment(ctx, pod_containers, volumes, spec))
}

pub fn gen_service(ctx: &DeployContext, port: i32) -> Service {
  Service {
    metadata: meta(
      &service_name(&ctx.workload_uuid),
      &ctx.namespace(),
      &ctx.workload_uuid,
    ),
    spec: Some(ServiceSpec {
      selector: Some(workload_labels(&ctx.workload_uuid)),
      ports: Some(vec![ServicePort {
        name: Some("http".to_owned()),
        protocol: Some("TCP".to_owned()),
        port,
        target_port: Some(IntOrString::Int(port)),
        ..Default::default()
      }]),
      ..Default::default()
    }),
    ..Default::default()
  }
}

pub fn gen_ingress(ctx: &DeployContext, port: i32) -> Ingress {
  let mut metadata = meta(
    &ingress_name(&ctx.workload_uuid),
    &ctx.namespace(),
    &ctx.workload_uuid,
  );
  metadata.annotations = Some(BTreeMap::from([(
    "kubernetes.io/ingress.class".to_owned(),
    ctx.ingress_class.clone(),
  )]));
  Ingress {
    metadata,
    spec: Some(IngressSpec {
      rules: Some(vec![IngressRule {
        host: Some(ctx.host.clone()),
        http: Some(HTTPIngressRuleValue {
          paths: vec![HTTPIngressPath {
            path: Some("/".to_owned()),
            path_type: "Exact".to_owned(),
            backend: IngressBackend {
              service: Some(IngressServiceBackend {
                name: service_name(&ctx.workload_uuid),
                port: Some(ServiceBackendPort {
                  number: Some(port),
                  ..Default::default()
                }),
              }),
              ..Default::default()
            },
          }],
        }),
      }]),
      ..Default::default()
    }),
    ..Default::default()
  }
}

/// Create the tenant namespace, an existing one is kept
pub async fn ensure_namespace(
  cluster: &dyn ClusterApi,
  wallet: &str,
) -> IoResult<String> {
  let name = namespace_name(wallet);
  match cluster.get_namespace(&name).await {
    Ok(_) => return Ok(name),
    Err(err) if err.is_not_found() => {}
    Err(err) => return Err(err),
  }
  match cluster.create_namespace(&gen_namespace(wallet)).await {
    Ok(_) => log::info!("deployment::ensure_namespace: {name} created"),
    Err(err) if err.is_already_exists() => {}
    Err(err) => return Err(err),
  }
  Ok(name)
}

async fn expose(
  cluster: &dyn ClusterApi,
  ctx: &DeployContext,
  port: i32,
) -> IoResult<()> {
  let namespace = ctx.namespace();
  cluster
    .create_service(&namespace, &gen_service(ctx, port))
    .await?;
  log::info!(
    "deployment::expose: service {} created",
    service_name(&ctx.workload_uuid)
  );
  cluster
    .create_ingress(&namespace, &gen_ingress(ctx, port))
    .await?;
  log::info!(
    "deployment::expose: ingress {} routes {}",
    ingress_name(&ctx.workload_uuid),
    ctx.host
  );
  Ok(())
}

/// Remove what a previous run left, then create the namespace.
/// `images` are used by the new deployment and are not removed.
async fn prepare(
  ctx: &DeployContext,
  images: &[String],
  state: &SystemState,
) -> IoResult<String> {
  utils::teardown::run_keeping(
    &ctx.namespace(),
    &ctx.workload_uuid,
    images,
    state,
  )
  .await?;
  ensure_namespace(state.cluster.as_ref(), &ctx.wallet).await
}

/// Images of every container of a manifest, dependencies included
pub fn manifest_images(containers: &[ContainerSpec]) -> Vec<String> {
  containers
    .iter()
    .flat_map(|container| {
      std::iter::once(container.image.clone())
        .chain(container.depends.iter().map(|dep| dep.image.clone()))
    })
    .collect()
}

async fn submit(
  ctx: &DeployContext,
  deployment: &Deployment,
  port: i32,
  state: &SystemState,
) -> IoResult<()> {
  let namespace = ctx.namespace();
  state
    .cluster
    .create_deployment(&namespace, deployment)
    .await?;
  log::info!(
    "deployment::submit: {} created in {namespace}",
    deployment_name(&ctx.workload_uuid)
  );
  state.status.publish(&ctx.job_uuid, JobStatus::PullingImage);
  expose(state.cluster.as_ref(), ctx, port).await?;
  state
    .status
    .publish(&ctx.job_uuid, JobStatus::DeployedToCluster);
  Ok(())
}

/// Deploy a single image workload
pub async fn deploy_image(
  ctx: &DeployContext,
  image: &ImageWorkload,
  spec: &ResourceSpec,
  state: &SystemState,
) -> IoResult<()> {
  let deployment = gen_image_deployment(ctx, image, spec)?;
  prepare(ctx, std::slice::from_ref(&image.image), state).await?;
  submit(ctx, &deployment, image.exposed_port, state).await
}

/// Deploy a manifest workload, `directory` holds the mounted files
pub async fn deploy_manifest(
  ctx: &DeployContext,
  directory: &Path,
  containers: &[ContainerSpec],
  spec: &ResourceSpec,
  state: &SystemState,
) -> IoResult<()> {
  let primary = containers.first().ok_or_else(|| {
    IoError::invalid_input("Manifest", "at least one service is required")
  })?;
  let port = primary.ports.first().copied().ok_or_else(|| {
    IoError::invalid_input(
      "Manifest",
      format!("service {} exposes no port", primary.name),
    )
  })?;
  // Validate quantities before touching the cluster
  gen_resources(spec)?;
  let config_map = match &primary.volume_mount {
    Some(mount) => Some(gen_config_map(ctx, directory, &mount.name).await?),
    None => None,
  };
  let namespace = prepare(ctx, &manifest_images(containers), state).await?;
  if let Some(config_map) = &config_map {
    state
      .cluster
      .create_config_map(&namespace, config_map)
      .await?;
  }
  let deployment =
    gen_manifest_deployment(ctx, containers, spec, config_map.as_ref())?;
  submit(ctx, &deployment, port, state).await
}

#[cfg(test)]
mod tests {
  use ncp_stubs::workload::VolumeMount;

  use super::*;

  use crate::utils::{hardware, tests::*};

  fn gen_ctx() -> DeployContext {
    DeployContext {
      job_uuid: "job-1".to_owned(),
      wallet: "0xabc".to_owned(),
      workload_uuid: "space-1".to_owned(),
      workload_name: "demo".to_owned(),
      host: "abcdefghij.provider.test".to_owned(),
      ingress_class: "traefik".to_owned(),
    }
  }

  fn gpu_spec() -> ResourceSpec {
    hardware::parse("Nvidia RTX 3090 · CPU 8 vCPU · Memory 32 GB").unwrap()
  }

  fn cpu_spec() -> ResourceSpec {
    hardware::parse("CPU Only · CPU 4 Core · Memory 8 GB").unwrap()
  }

  fn pod_spec(deployment: &Deployment) -> PodSpec {
    deployment
      .spec
      .clone()
      .and_then(|spec| spec.template.spec)
      .unwrap()
  }

  fn env_of(container: &Container) -> Vec<(String, String)> {
    container
      .env
      .clone()
      .unwrap_or_default()
      .into_iter()
      .map(|var| (var.name, var.value.unwrap_or_default()))
      .collect()
  }

  fn gen_manifest() -> Vec<ContainerSpec> {
    vec![
      ContainerSpec {
        name: "web".to_owned(),
        image: "ghcr.io/acme/web:latest".to_owned(),
        env: vec![
          EnvVar::new("NEXTAUTH_URL", "http://localhost:3000"),
          EnvVar::new("MODE", "prod"),
        ],
        ports: vec![3000],
        depends: vec![DependencySpec {
          name: "db".to_owned(),
          image: "redis:7".to_owned(),
          ports: vec![6379],
          ready_cmd: vec!["redis-cli".to_owned(), "ping".to_owned()],
          ..Default::default()
        }],
        ..Default::default()
      },
      ContainerSpec {
        name: "worker".to_owned(),
        image: "ghcr.io/acme/worker:latest".to_owned(),
        ..Default::default()
      },
    ]
  }

  #[test]
  fn object_names() {
    let ctx = gen_ctx();
    assert_eq!(namespace_name("0xABC"), "ns-0xabc");
    assert_eq!(ctx.namespace(), "ns-0xabc");
    assert_eq!(deployment_name("space-1"), "deploy-space-1");
    assert_eq!(service_name("space-1"), "svc-space-1");
    assert_eq!(ingress_name("space-1"), "ing-space-1");
    assert_eq!(container_name("space-1"), "pod-space-1");
    assert_eq!(config_map_name("space-1", "conf/app.yaml"), "space-1-app");
  }

  #[test]
  fn quantities() {
    let quantity = parse_quantity(&Specification::new(32, "G")).unwrap();
    assert_eq!(quantity.0, "32G");
    let quantity = parse_quantity(&Specification::new(30, "Gi")).unwrap();
    assert_eq!(quantity.0, "30Gi");
    assert!(parse_quantity(&Specification::new(32, "GB")).is_err());
    assert!(parse_quantity(&Specification::new(0, "Gi")).is_err());
  }

  #[test]
  fn limits_equal_requests() {
    let resources = gen_resources(&gpu_spec()).unwrap();
    let limits = resources.limits.unwrap();
    assert_eq!(Some(limits.clone()), resources.requests);
    assert_eq!(limits["cpu"].0, "8");
    assert_eq!(limits["memory"].0, "32G");
    assert_eq!(limits["ephemeral-storage"].0, "30Gi");
    assert_eq!(limits[vars::GPU_RESOURCE].0, "1");
    let resources = gen_resources(&cpu_spec()).unwrap();
    let limits = resources.limits.unwrap();
    assert!(!limits.contains_key(vars::GPU_RESOURCE));
    assert!(!resources.requests.unwrap().contains_key(vars::GPU_RESOURCE));
    assert_eq!(limits["cpu"].0, "4");
  }

  #[test]
  fn node_selector_follows_gpu() {
    let selector = gen_node_selector(&gpu_spec()).unwrap();
    assert_eq!(selector.get("NVIDIA-RTX-3090").map(String::as_str), Some("true"));
    assert_eq!(gen_node_selector(&cpu_spec()), None);
  }

  #[test]
  fn image_deployment() {
    let ctx = gen_ctx();
    let image = ImageWorkload {
      image: "ncprovider/demo-space-1:job-1".to_owned(),
      dockerfile_path: "/tmp/Dockerfile".to_owned(),
      exposed_port: 7860,
    };
    let deployment = gen_image_deployment(&ctx, &image, &gpu_spec()).unwrap();
    assert_eq!(deployment.metadata.name.as_deref(), Some("deploy-space-1"));
    assert_eq!(deployment.metadata.namespace.as_deref(), Some("ns-0xabc"));
    let selector = deployment.spec.clone().unwrap().selector.match_labels;
    assert_eq!(selector, Some(workload_labels("space-1")));
    let pod = pod_spec(&deployment);
    assert!(pod.node_selector.unwrap().contains_key("NVIDIA-RTX-3090"));
    assert_eq!(pod.containers.len(), 1);
    let container = &pod.containers[0];
    assert_eq!(container.name, "pod-space-1");
    assert_eq!(container.image_pull_policy.as_deref(), Some("IfNotPresent"));
    assert_eq!(container.ports.clone().unwrap()[0].container_port, 7860);
    assert_eq!(
      env_of(container),
      vec![
        ("wallet_address".to_owned(), "0xabc".to_owned()),
        ("space_uuid".to_owned(), "space-1".to_owned()),
        ("result_url".to_owned(), "abcdefghij.provider.test".to_owned()),
        ("job_uuid".to_owned(), "job-1".to_owned()),
      ]
    );
  }

  #[test]
  fn image_deployment_rejects_bad_quantity() {
    let mut spec = cpu_spec();
    spec.memory.unit = "Gigs".to_owned();
    let image = ImageWorkload::default();
    let err = gen_image_deployment(&gen_ctx(), &image, &spec).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
  }

  #[test]
  fn manifest_deployment() {
    let ctx = gen_ctx();
    let deployment =
      gen_manifest_deployment(&ctx, &gen_manifest(), &cpu_spec(), None)
        .unwrap();
    let pod = pod_spec(&deployment);
    assert_eq!(pod.node_selector, None);
    let names = pod
      .containers
      .iter()
      .map(|container| container.name.as_str())
      .collect::<Vec<_>>();
    assert_eq!(names, vec!["space-1-db", "space-1-web", "space-1-worker"]);
    let db = &pod.containers[0];
    assert!(db.resources.is_none());
    let probe = db.readiness_probe.clone().unwrap();
    assert_eq!(probe.initial_delay_seconds, Some(5));
    assert_eq!(probe.period_seconds, Some(5));
    assert_eq!(
      probe.exec.unwrap().command,
      Some(vec!["redis-cli".to_owned(), "ping".to_owned()])
    );
    let web = &pod.containers[1];
    assert!(web.resources.is_some());
    let env = env_of(web);
    assert_eq!(
      env[0],
      (
        "NEXTAUTH_URL".to_owned(),
        "https://abcdefghij.provider.test".to_owned()
      )
    );
    assert_eq!(env[1], ("MODE".to_owned(), "prod".to_owned()));
    assert_eq!(env[5], ("job_uuid".to_owned(), "job-1".to_owned()));
    let worker = &pod.containers[2];
    assert!(worker.resources.is_none());
    assert!(env_of(worker).contains(&("space_uuid".to_owned(), "space-1".to_owned())));
  }

  #[test]
  fn manifest_without_service() {
    let err = gen_manifest_deployment(&gen_ctx(), &[], &cpu_spec(), None)
      .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
  }

  #[test]
  fn images_of_manifest() {
    assert_eq!(
      manifest_images(&gen_manifest()),
      vec![
        "ghcr.io/acme/web:latest",
        "redis:7",
        "ghcr.io/acme/worker:latest",
      ]
    );
  }

  #[test]
  fn service_and_ingress() {
    let ctx = gen_ctx();
    let service = gen_service(&ctx, 3000);
    assert_eq!(service.metadata.name.as_deref(), Some("svc-space-1"));
    let service_spec = service.spec.unwrap();
    assert_eq!(service_spec.selector, Some(workload_labels("space-1")));
    let port = &service_spec.ports.unwrap()[0];
    assert_eq!(port.port, 3000);
    assert_eq!(port.target_port, Some(IntOrString::Int(3000)));
    let ingress = gen_ingress(&ctx, 3000);
    assert_eq!(ingress.metadata.name.as_deref(), Some("ing-space-1"));
    assert_eq!(
      ingress.metadata.annotations.unwrap()["kubernetes.io/ingress.class"],
      "traefik"
    );
    let rule = &ingress.spec.unwrap().rules.unwrap()[0];
    assert_eq!(rule.host.as_deref(), Some("abcdefghij.provider.test"));
    let path = &rule.http.as_ref().unwrap().paths[0];
    assert_eq!(path.path.as_deref(), Some("/"));
    let backend = path.backend.service.clone().unwrap();
    assert_eq!(backend.name, "svc-space-1");
    assert_eq!(backend.port.unwrap().number, Some(3000));
  }

  #[ntex::test]
  async fn config_map_from_file() {
    let dir = std::env::temp_dir().join(format!("ncprovider-cm-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("app.conf"), "listen 3000\n").unwrap();
    let ctx = gen_ctx();
    let config_map = gen_config_map(&ctx, &dir, "app.conf").await.unwrap();
    assert_eq!(config_map.metadata.name.as_deref(), Some("space-1-app"));
    assert_eq!(config_map.data.unwrap()["app.conf"], "listen 3000\n");
    let err = gen_config_map(&ctx, &dir, "../app.conf").await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    let err = gen_config_map(&ctx, &dir, "missing.conf").await.unwrap_err();
    assert!(err.is_not_found());
    let mut containers = gen_manifest();
    containers[0].volume_mount = Some(VolumeMount {
      name: "app.conf".to_owned(),
      path: "/etc/app".to_owned(),
    });
    let deployment = gen_manifest_deployment(
      &ctx,
      &containers,
      &cpu_spec(),
      Some(&config_map_for(&ctx)),
    )
    .unwrap();
    let pod = pod_spec(&deployment);
    let volume = &pod.volumes.unwrap()[0];
    assert_eq!(volume.name, "space-1-app");
    let mount = &pod.containers[1].volume_mounts.clone().unwrap()[0];
    assert_eq!(mount.mount_path, "/etc/app");
    assert_eq!(mount.name, "space-1-app");
    std::fs::remove_dir_all(&dir).unwrap();
  }

  fn config_map_for(ctx: &DeployContext) -> ConfigMap {
    ConfigMap {
      metadata: meta("space-1-app", &ctx.namespace(), &ctx.workload_uuid),
      ..Default::default()
    }
  }

  #[ntex::test]
  async fn namespace_created_once() {
    let system = gen_test_system();
    let cluster = system.cluster.as_ref();
    assert_eq!(ensure_namespace(cluster, "0xABC").await.unwrap(), "ns-0xabc");
    assert_eq!(ensure_namespace(cluster, "0xabc").await.unwrap(), "ns-0xabc");
    let creations = system
      .cluster
      .calls()
      .into_iter()
      .filter(|call| call.starts_with("create_namespace"))
      .count();
    assert_eq!(creations, 1);
    let namespace = system.cluster.namespace("ns-0xabc").unwrap();
    assert_eq!(
      namespace.metadata.labels.unwrap()[vars::WALLET_LABEL],
      "0xabc"
    );
  }

  #[ntex::test]
  async fn deploy_image_creates_objects() {
    let system = gen_test_system();
    let ctx = gen_ctx();
    let image = ImageWorkload {
      image: "ncprovider/demo-space-1:job-1".to_owned(),
      dockerfile_path: "/tmp/Dockerfile".to_owned(),
      exposed_port: 8080,
    };
    deploy_image(&ctx, &image, &gpu_spec(), &system.state).await.unwrap();
    assert!(system.cluster.deployment("ns-0xabc", "deploy-space-1").is_some());
    assert!(system.cluster.service("ns-0xabc", "svc-space-1").is_some());
    assert!(system.cluster.ingress("ns-0xabc", "ing-space-1").is_some());
    assert_eq!(
      system.state.status.current("job-1"),
      Some(JobStatus::DeployedToCluster)
    );
    // A second deploy removes the previous objects first
    system.cluster.clear_calls();
    deploy_image(&ctx, &image, &gpu_spec(), &system.state).await.unwrap();
    let calls = system.cluster.calls();
    let teardown = calls
      .iter()
      .position(|call| call == "delete_deployment ns-0xabc/deploy-space-1")
      .unwrap();
    let create = calls
      .iter()
      .position(|call| call == "create_deployment ns-0xabc/deploy-space-1")
      .unwrap();
    assert!(teardown < create);
    // The image of the new deployment is still in the local store
    assert!(system.builder.removed().is_empty());
  }

  #[ntex::test]
  async fn deploy_image_invalid_spec_touches_nothing() {
    let system = gen_test_system();
    let mut spec = cpu_spec();
    spec.cpu.quantity = 0;
    let err = deploy_image(&gen_ctx(), &ImageWorkload::default(), &spec, &system.state)
      .await
      .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    assert!(system.cluster.calls().is_empty());
  }

  #[ntex::test]
  async fn deploy_manifest_with_config_map() {
    let system = gen_test_system();
    let dir = std::env::temp_dir().join(format!("ncprovider-manifest-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("app.conf"), "listen 3000\n").unwrap();
    let mut containers = gen_manifest();
    containers[0].volume_mount = Some(VolumeMount {
      name: "app.conf".to_owned(),
      path: "/etc/app".to_owned(),
    });
    let ctx = gen_ctx();
    deploy_manifest(&ctx, &dir, &containers, &cpu_spec(), &system.state)
      .await
      .unwrap();
    assert!(system.cluster.config_map("ns-0xabc", "space-1-app").is_some());
    let service = system.cluster.service("ns-0xabc", "svc-space-1").unwrap();
    assert_eq!(service.spec.unwrap().ports.unwrap()[0].port, 3000);
    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[ntex::test]
  async fn deploy_manifest_requires_port() {
    let system = gen_test_system();
    let mut containers = gen_manifest();
    containers[0].ports.clear();
    let err = deploy_manifest(
      &gen_ctx(),
      Path::new("/tmp"),
      &containers,
      &cpu_spec(),
      &system.state,
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    assert!(system.cluster.calls().is_empty());
  }
}
