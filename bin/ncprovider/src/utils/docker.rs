use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bollard_next::{image::RemoveImageOptions, Docker, API_DEFAULT_VERSION};
use ntex::http::client::Client;

use ncp_error::io::{FromIo, IoError, IoResult};
use ncp_stubs::{config::DaemonConfig, space::SpaceFile, workload::ContainerSpec};

use crate::{
  models::{BuiltImage, WorkloadBuilder, WorkloadSourceKind},
  utils,
};

/// Largest file accepted from a workload file list
const MAX_FILE_SIZE: usize = 256 * 1024 * 1024;

/// Builds workload images with the docker cli and cleans them with the api
pub struct DockerBuilder {
  docker: Docker,
  docker_host: String,
  build_dir: PathBuf,
}

/// Path of `name` inside a build directory, names escaping it are rejected
pub fn relative_path(name: &str) -> IoResult<PathBuf> {
  let path = Path::new(name);
  let escapes = name.is_empty()
    || path
      .components()
      .any(|component| !matches!(component, Component::Normal(_)));
  if escapes {
    return Err(IoError::invalid_input(
      "WorkloadFile",
      format!("'{name}' is not a relative file name"),
    ));
  }
  Ok(path.to_owned())
}

/// Pick the manifest, or else the directory holding the Dockerfile
pub fn select_source(
  dir: &Path,
  files: &[SpaceFile],
) -> IoResult<WorkloadSourceKind> {
  let manifest = files.iter().find(|file| {
    matches!(
      Path::new(&file.name).extension().and_then(|ext| ext.to_str()),
      Some("yaml") | Some("yml")
    )
  });
  if let Some(manifest) = manifest {
    return Ok(WorkloadSourceKind::Manifest(
      dir.join(relative_path(&manifest.name)?),
    ));
  }
  let dockerfile = files.iter().find(|file| {
    Path::new(&file.name).file_name().and_then(|name| name.to_str())
      == Some("Dockerfile")
  });
  match dockerfile {
    Some(dockerfile) => {
      let path = dir.join(relative_path(&dockerfile.name)?);
      let context = path.parent().map(Path::to_path_buf).unwrap_or_default();
      Ok(WorkloadSourceKind::Image(context))
    }
    None => Err(IoError::invalid_input(
      "WorkloadFile",
      "neither a Dockerfile nor a manifest was found",
    )),
  }
}

/// Port of the last `EXPOSE` instruction
pub fn parse_exposed_port(dockerfile: &str) -> IoResult<i32> {
  let port = dockerfile
    .lines()
    .filter_map(|line| {
      let mut tokens = line.split_whitespace();
      match tokens.next() {
        Some(instruction) if instruction.eq_ignore_ascii_case("EXPOSE") => {
          tokens.next()
        }
        _ => None,
      }
    })
    .last()
    .ok_or_else(|| {
      IoError::invalid_input("Dockerfile", "no EXPOSE instruction")
    })?;
  let port = port.strip_suffix("/tcp").unwrap_or(port);
  port.parse::<i32>().map_err(|err| {
    IoError::invalid_input("Dockerfile", format!("EXPOSE {port}: {err}"))
  })
}

/// Tag of the image built for a job
pub fn gen_image_tag(job_uuid: &str, workload_uuid: &str, name: &str) -> String {
  let name = name
    .to_lowercase()
    .chars()
    .map(|c| {
      if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
        c
      } else {
        '-'
      }
    })
    .collect::<String>();
  let name = name.trim_matches(|c| c == '-' || c == '.' || c == '_');
  let name = if name.is_empty() { "workload" } else { name };
  let job = job_uuid.to_lowercase().chars().take(8).collect::<String>();
  format!("ncprovider/{name}-{workload_uuid}:{job}")
}

async fn download(url: &str, path: &Path) -> IoResult<()> {
  let client = Client::build()
    .timeout(ntex::time::Millis::from_secs(600))
    .finish();
  let mut res = client
    .get(url)
    .send()
    .await
    .map_err(|err| err.map_err_context(|| url.to_owned()))?;
  if res.status().is_redirection() {
    let location = res
      .headers()
      .get("Location")
      .and_then(|location| location.to_str().ok())
      .map(ToOwned::to_owned)
      .ok_or_else(|| {
        IoError::invalid_data("Download", format!("{url} redirects nowhere"))
      })?;
    res = client
      .get(&location)
      .send()
      .await
      .map_err(|err| err.map_err_context(|| location.clone()))?;
  }
  if !res.status().is_success() {
    return Err(IoError::invalid_data(
      "Download",
      format!("{url} responded {}", res.status()),
    ));
  }
  let body = res
    .body()
    .limit(MAX_FILE_SIZE)
    .await
    .map_err(|err| err.map_err_context(|| url.to_owned()))?;
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent)
      .await
      .map_err(|err| err.map_err_context(|| parent.display().to_string()))?;
  }
  tokio::fs::write(path, &body)
    .await
    .map_err(|err| err.map_err_context(|| path.display().to_string()))?;
  Ok(())
}

impl DockerBuilder {
  pub fn new(conf: &DaemonConfig) -> IoResult<Self> {
    let docker =
      Docker::connect_with_unix(&conf.docker_host, 120, API_DEFAULT_VERSION)
        .map_err(|err| err.map_err_context(|| "Docker"))?;
    Ok(Self {
      docker,
      docker_host: conf.docker_host.clone(),
      build_dir: Path::new(&conf.state_dir).join("build"),
    })
  }
}

#[async_trait(?Send)]
impl WorkloadBuilder for DockerBuilder {
  async fn resolve_workload(
    &self,
    workload_uuid: &str,
    files: &[SpaceFile],
  ) -> IoResult<WorkloadSourceKind> {
    let dir = self.build_dir.join(relative_path(workload_uuid)?);
    if let Err(err) = tokio::fs::remove_dir_all(&dir).await {
      if err.kind() != std::io::ErrorKind::NotFound {
        return Err(err.map_err_context(|| dir.display().to_string()).into());
      }
    }
    for file in files {
      let path = dir.join(relative_path(&file.name)?);
      log::debug!("docker::resolve_workload: downloading {}", file.name);
      download(&file.url, &path).await?;
    }
    select_source(&dir, files)
  }

  async fn build_image(
    &self,
    job_uuid: &str,
    workload_uuid: &str,
    name: &str,
    context: &Path,
  ) -> IoResult<BuiltImage> {
    let tag = gen_image_tag(job_uuid, workload_uuid, name);
    log::info!("docker::build_image: building {tag}");
    let output = tokio::process::Command::new("docker")
      .env("DOCKER_HOST", format!("unix://{}", self.docker_host))
      .arg("build")
      .arg("-t")
      .arg(&tag)
      .arg(context)
      .output()
      .await
      .map_err(|err| err.map_err_context(|| "docker build"))?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let tail = stderr.lines().rev().take(5).collect::<Vec<_>>();
      return Err(IoError::invalid_data(
        "DockerBuild",
        format!(
          "{tag} failed with {}: {}",
          output.status,
          tail.into_iter().rev().collect::<Vec<_>>().join("\n")
        ),
      ));
    }
    Ok(BuiltImage {
      image: tag,
      dockerfile_path: context.join("Dockerfile"),
    })
  }

  async fn extract_exposed_port(&self, dockerfile_path: &Path) -> IoResult<i32> {
    let content = tokio::fs::read_to_string(dockerfile_path)
      .await
      .map_err(|err| {
        err.map_err_context(|| dockerfile_path.display().to_string())
      })?;
    parse_exposed_port(&content)
  }

  async fn parse_manifest(&self, path: &Path) -> IoResult<Vec<ContainerSpec>> {
    utils::manifest::read(path).await
  }

  async fn remove_image(&self, image_id: &str) -> IoResult<()> {
    let options = RemoveImageOptions {
      force: true,
      ..Default::default()
    };
    self
      .docker
      .remove_image(image_id, Some(options), None)
      .await
      .map_err(|err| err.map_err_context(|| format!("Image {image_id}")))?;
    log::info!("docker::remove_image: {image_id} removed");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn file(name: &str) -> SpaceFile {
    SpaceFile {
      name: name.to_owned(),
      url: format!("https://files.test/{name}"),
    }
  }

  #[test]
  fn exposed_port() {
    let dockerfile = "FROM python:3.11\nEXPOSE 7860\nexpose 8080/tcp 9090\nCMD [\"python\"]\n";
    assert_eq!(parse_exposed_port(dockerfile).unwrap(), 8080);
    assert_eq!(parse_exposed_port("FROM scratch\nEXPOSE 80/tcp").unwrap(), 80);
    let err = parse_exposed_port("FROM scratch\n").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    assert!(parse_exposed_port("EXPOSE http").is_err());
  }

  #[test]
  fn file_names() {
    assert_eq!(
      relative_path("demo/Dockerfile").unwrap(),
      PathBuf::from("demo/Dockerfile")
    );
    assert!(relative_path("../Dockerfile").is_err());
    assert!(relative_path("/etc/passwd").is_err());
    assert!(relative_path("demo/../../x").is_err());
    assert!(relative_path("").is_err());
  }

  #[test]
  fn source_selection() {
    let dir = Path::new("/var/lib/ncprovider/build/space-1");
    let kind =
      select_source(dir, &[file("demo/app.py"), file("demo/Dockerfile")])
        .unwrap();
    assert_eq!(kind, WorkloadSourceKind::Image(dir.join("demo")));
    let kind =
      select_source(dir, &[file("demo/Dockerfile"), file("demo/compose.yml")])
        .unwrap();
    assert_eq!(
      kind,
      WorkloadSourceKind::Manifest(dir.join("demo/compose.yml"))
    );
    let err = select_source(dir, &[file("demo/app.py")]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
  }

  #[test]
  fn image_tag() {
    assert_eq!(
      gen_image_tag("3F2B9C1D-aaaa", "space-1", "My Demo!"),
      "ncprovider/my-demo-space-1:3f2b9c1d"
    );
    assert_eq!(
      gen_image_tag("job", "space-1", "***"),
      "ncprovider/workload-space-1:job"
    );
  }
}
