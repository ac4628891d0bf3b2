use ncp_error::io::{FromIo, IoError, IoResult};
use ncp_stubs::config::{DaemonConfig, DaemonConfigFile};

use crate::cli::Cli;
use crate::utils;

fn pick<T>(arg: &Option<T>, file: &Option<T>) -> Option<T>
where
  T: Clone,
{
  arg.clone().or_else(|| file.clone())
}

fn gen_daemon_conf(
  args: &Cli,
  config: &DaemonConfigFile,
) -> IoResult<DaemonConfig> {
  let default = DaemonConfig::default();
  let hosts = pick(&args.hosts, &config.hosts).unwrap_or(default.hosts);
  let state_dir =
    pick(&args.state_dir, &config.state_dir).unwrap_or(default.state_dir);
  let docker_host =
    pick(&args.docker_host, &config.docker_host).unwrap_or(default.docker_host);
  let kubeconfig = pick(&args.kubeconfig, &config.kubeconfig);
  let ingress_class = pick(&args.ingress_class, &config.ingress_class)
    .unwrap_or(default.ingress_class);
  let region = pick(&args.region, &config.region).unwrap_or(default.region);
  let redis_url = pick(&args.redis_url, &config.redis_url)
    .filter(|url| !url.is_empty())
    .ok_or_else(|| {
      IoError::invalid_input("Config", "redis_url is required")
    })?;
  let domain = pick(&args.domain, &config.domain)
    .filter(|domain| !domain.is_empty())
    .ok_or_else(|| IoError::invalid_input("Config", "domain is required"))?;
  let hostname = match pick(&args.hostname, &config.hostname) {
    Some(hostname) => hostname,
    None => utils::network::get_hostname()
      .map_err(|err| err.map_err_context(|| "Hostname"))?,
  };
  Ok(DaemonConfig {
    hosts,
    state_dir,
    docker_host,
    kubeconfig,
    redis_url,
    domain,
    hostname,
    ingress_class,
    region,
  })
}

fn read_config_file(config_dir: &str) -> IoResult<DaemonConfigFile> {
  let config_path = std::path::Path::new(config_dir).join("ncprovider.conf");
  if !config_path.exists() {
    return Ok(DaemonConfigFile::default());
  }
  let content = std::fs::read_to_string(&config_path).map_err(|err| {
    err.map_err_context(|| {
      format!("Config file {}", config_path.display())
    })
  })?;
  let config =
    serde_yaml::from_str::<DaemonConfigFile>(&content).map_err(|err| {
      err.map_err_context(|| {
        format!("Config file {}", config_path.display())
      })
    })?;
  Ok(config)
}

/// Read `<conf_dir>/ncprovider.conf` and merge it with the cli arguments,
/// arguments take priority over the file and the file over the defaults.
pub fn init(args: &Cli) -> IoResult<DaemonConfig> {
  let file_config = read_config_file(&args.conf_dir)?;
  gen_daemon_conf(args, &file_config)
}
