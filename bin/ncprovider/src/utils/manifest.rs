use std::collections::HashSet;

use ncp_error::io::{FromIo, IoError, IoResult};
use ncp_stubs::workload::{
  ContainerSpec, DependencySpec, EnvVar, Manifest, ManifestDependency,
  ManifestService,
};

/// Parse `KEY=value` entries, keys must be unique
fn parse_env(owner: &str, entries: &[String]) -> IoResult<Vec<EnvVar>> {
  let mut keys = HashSet::new();
  entries
    .iter()
    .map(|entry| {
      let Some((name, value)) = entry.split_once('=') else {
        return Err(IoError::invalid_input(
          "Manifest",
          format!("{owner}: env '{entry}' is not KEY=value"),
        ));
      };
      let name = name.trim();
      if name.is_empty() {
        return Err(IoError::invalid_input(
          "Manifest",
          format!("{owner}: env '{entry}' has an empty key"),
        ));
      }
      if !keys.insert(name.to_owned()) {
        return Err(IoError::invalid_input(
          "Manifest",
          format!("{owner}: env {name} is declared twice"),
        ));
      }
      Ok(EnvVar::new(name, value))
    })
    .collect()
}

fn check_image(owner: &str, image: &str) -> IoResult<()> {
  if image.trim().is_empty() {
    return Err(IoError::invalid_input(
      "Manifest",
      format!("{owner}: image is required"),
    ));
  }
  Ok(())
}

fn to_dependency(dependency: &ManifestDependency) -> IoResult<DependencySpec> {
  check_image(&dependency.name, &dependency.image)?;
  Ok(DependencySpec {
    name: dependency.name.clone(),
    image: dependency.image.clone(),
    command: dependency.command.clone(),
    args: dependency.args.clone(),
    env: parse_env(&dependency.name, &dependency.env)?,
    ports: dependency.ports.clone(),
    ready_cmd: dependency.ready_cmd.clone(),
  })
}

fn to_container(service: &ManifestService) -> IoResult<ContainerSpec> {
  check_image(&service.name, &service.image)?;
  Ok(ContainerSpec {
    name: service.name.clone(),
    image: service.image.clone(),
    command: service.command.clone(),
    args: service.args.clone(),
    env: parse_env(&service.name, &service.env)?,
    ports: service.ports.clone(),
    volume_mount: service.volume_mount.clone(),
    depends: service
      .depends_on
      .iter()
      .map(to_dependency)
      .collect::<IoResult<Vec<_>>>()?,
  })
}

/// Convert a manifest into container specs, the first one is the primary
pub fn to_containers(manifest: &Manifest) -> IoResult<Vec<ContainerSpec>> {
  let Some(primary) = manifest.services.first() else {
    return Err(IoError::invalid_input(
      "Manifest",
      "at least one service is required",
    ));
  };
  if primary.ports.is_empty() {
    return Err(IoError::invalid_input(
      "Manifest",
      format!("{}: the primary service must expose a port", primary.name),
    ));
  }
  manifest.services.iter().map(to_container).collect()
}

/// Parse a yaml manifest
pub fn parse(content: &str) -> IoResult<Vec<ContainerSpec>> {
  let manifest = serde_yaml::from_str::<Manifest>(content)
    .map_err(|err| err.map_err_context(|| "Manifest"))?;
  to_containers(&manifest)
}

/// Read and parse the manifest at `path`
pub async fn read(path: &std::path::Path) -> IoResult<Vec<ContainerSpec>> {
  let content = tokio::fs::read_to_string(path)
    .await
    .map_err(|err| err.map_err_context(|| path.display().to_string()))?;
  parse(&content)
}
