use clap::Parser;

use ncp_error::io::FromIo;

mod boot;
mod cli;
mod config;
mod models;
mod server;
mod services;
mod subsystem;
mod tasks;
mod utils;
mod vars;
mod version;

/// Runs leased workloads of a compute marketplace on a kubernetes cluster
#[ntex::main]
async fn main() -> std::io::Result<()> {
  // Parse command line arguments
  let args = cli::Cli::parse();
  // Build env logger
  if std::env::var("LOG_LEVEL").is_err() {
    std::env::set_var("LOG_LEVEL", "ncprovider=info,warn,error");
  }
  env_logger::Builder::new()
    .parse_env("LOG_LEVEL")
    .format_target(false)
    .init();
  log::info!(
    "ncprovider_{}_{}_v{}:{}",
    version::ARCH,
    version::CHANNEL,
    version::VERSION,
    version::COMMIT_ID
  );
  // Merge command line arguments with the config file
  let config = match config::init(&args) {
    Err(err) => {
      err.print_and_exit();
    }
    Ok(config) => config,
  };
  // Connect the cluster, the lease store and docker, then start listeners
  let state = match boot::init(&config).await {
    Err(err) => {
      err.print_and_exit();
    }
    Ok(state) => state,
  };
  match server::gen(state).await {
    Err(err) => {
      err.map_err_context(|| "Daemon state").print_and_exit();
    }
    Ok(server) => {
      // Server should never shutdown unless it's explicitly asked
      if let Err(err) = server.await {
        err.map_err_context(|| "Http server").print_and_exit();
      }
    }
  }
  log::info!("shutdown");
  Ok(())
}
