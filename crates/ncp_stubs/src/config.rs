#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of the provider daemon
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DaemonConfig {
  /// List of hosts to listen on
  pub hosts: Vec<String>,
  /// Path to the state directory
  pub state_dir: String,
  /// Docker host used to build and push images
  #[cfg_attr(feature = "serde", serde(default = "default_docker_host"))]
  pub docker_host: String,
  /// Path to a kubeconfig, in cluster or default config is used if not set
  #[cfg_attr(
    feature = "serde",
    serde(default, skip_serializing_if = "Option::is_none")
  )]
  pub kubeconfig: Option<String>,
  /// Url of the lease store
  pub redis_url: String,
  /// Domain suffix of generated ingress hosts
  pub domain: String,
  /// Hostname of the node automatically detected if not set
  pub hostname: String,
  /// Ingress class annotation set on every ingress
  pub ingress_class: String,
  /// Region reported with the cluster statistics
  #[cfg_attr(feature = "serde", serde(default))]
  pub region: String,
}

/// Configuration File of the daemon
/// It is used to configure the daemon from a file
#[derive(Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DaemonConfigFile {
  pub hosts: Option<Vec<String>>,
  pub state_dir: Option<String>,
  pub docker_host: Option<String>,
  pub kubeconfig: Option<String>,
  pub redis_url: Option<String>,
  pub domain: Option<String>,
  pub hostname: Option<String>,
  pub ingress_class: Option<String>,
  pub region: Option<String>,
}

impl Default for DaemonConfig {
  fn default() -> Self {
    Self {
      hosts: vec!["tcp://0.0.0.0:8085".into()],
      state_dir: "/var/lib/ncprovider".into(),
      docker_host: default_docker_host(),
      kubeconfig: None,
      redis_url: String::default(),
      domain: String::default(),
      hostname: String::default(),
      ingress_class: "traefik".into(),
      region: String::default(),
    }
  }
}

fn default_docker_host() -> String {
  "/run/docker.sock".to_owned()
}
