use clap::Parser;

/// Compute provider daemon, runs leased workloads on a kubernetes cluster
#[derive(Debug, Clone, Parser)]
#[command(name = "ncprovider")]
#[command(author = "nexthat team <team@next-hat.com>")]
#[command(version)]
pub struct Cli {
  /// Hosts to listen to use tcp:// and unix:// [default: tcp://0.0.0.0:8085]
  #[clap(short = 'H', long = "hosts")]
  pub(crate) hosts: Option<Vec<String>>,
  /// State directory
  /// [default: /var/lib/ncprovider]
  #[clap(long)]
  pub(crate) state_dir: Option<String>,
  /// Config directory
  #[clap(long, default_value = "/etc/ncprovider")]
  pub(crate) conf_dir: String,
  /// Docker daemon socket used to build images [default: /run/docker.sock]
  #[clap(long)]
  pub(crate) docker_host: Option<String>,
  /// Path to a kubeconfig, in cluster config is inferred if not set
  #[clap(long)]
  pub(crate) kubeconfig: Option<String>,
  /// Url of the redis server holding leases
  #[clap(long)]
  pub(crate) redis_url: Option<String>,
  /// Domain suffix of generated hosts
  #[clap(long)]
  pub(crate) domain: Option<String>,
  /// Hostname to use for the node automatically detected if not set
  #[clap(long)]
  pub(crate) hostname: Option<String>,
  /// Ingress class set on created ingresses [default: traefik]
  #[clap(long)]
  pub(crate) ingress_class: Option<String>,
  /// Region reported with the cluster statistics
  #[clap(long)]
  pub(crate) region: Option<String>,
}
