#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An environment variable, order is preserved when injected
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnvVar {
  pub name: String,
  pub value: String,
}

impl EnvVar {
  pub fn new<N, V>(name: N, value: V) -> Self
  where
    N: Into<String>,
    V: Into<String>,
  {
    Self {
      name: name.into(),
      value: value.into(),
    }
  }
}

/// A local file mounted inside the container
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeMount {
  /// File name relative to the manifest directory
  pub name: String,
  /// Directory where the file is mounted
  pub path: String,
}

/// A container the primary container depends on
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencySpec {
  pub name: String,
  pub image: String,
  pub command: Vec<String>,
  pub args: Vec<String>,
  pub env: Vec<EnvVar>,
  pub ports: Vec<i32>,
  /// Command the readiness probe executes
  pub ready_cmd: Vec<String>,
}

/// A container declared by a manifest
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
  pub name: String,
  pub image: String,
  pub command: Vec<String>,
  pub args: Vec<String>,
  pub env: Vec<EnvVar>,
  pub ports: Vec<i32>,
  pub volume_mount: Option<VolumeMount>,
  pub depends: Vec<DependencySpec>,
}

/// A single image built from a Dockerfile
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageWorkload {
  pub image: String,
  pub dockerfile_path: String,
  pub exposed_port: i32,
}

/// What to run for a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadDescriptor {
  Image(ImageWorkload),
  Manifest {
    /// Directory holding the manifest, config mounts are read from it
    directory: String,
    containers: Vec<ContainerSpec>,
  },
}

/// Dependency entry of a manifest service
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ManifestDependency {
  pub name: String,
  pub image: String,
  #[cfg_attr(feature = "serde", serde(default))]
  pub command: Vec<String>,
  #[cfg_attr(feature = "serde", serde(default))]
  pub args: Vec<String>,
  /// Environment as `KEY=value`
  #[cfg_attr(feature = "serde", serde(default))]
  pub env: Vec<String>,
  #[cfg_attr(feature = "serde", serde(default))]
  pub ports: Vec<i32>,
  #[cfg_attr(feature = "serde", serde(default))]
  pub ready_cmd: Vec<String>,
}

/// Service entry of a manifest
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ManifestService {
  pub name: String,
  pub image: String,
  #[cfg_attr(feature = "serde", serde(default))]
  pub command: Vec<String>,
  #[cfg_attr(feature = "serde", serde(default))]
  pub args: Vec<String>,
  /// Environment as `KEY=value`
  #[cfg_attr(feature = "serde", serde(default))]
  pub env: Vec<String>,
  #[cfg_attr(feature = "serde", serde(default))]
  pub ports: Vec<i32>,
  #[cfg_attr(feature = "serde", serde(default))]
  pub volume_mount: Option<VolumeMount>,
  #[cfg_attr(feature = "serde", serde(default))]
  pub depends_on: Vec<ManifestDependency>,
}

/// Multi container application description
/// The first service is the primary container
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Manifest {
  #[cfg_attr(feature = "serde", serde(default))]
  pub version: Option<String>,
  pub services: Vec<ManifestService>,
}
