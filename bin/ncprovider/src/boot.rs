use tokio::fs;

use ncp_error::io::{FromIo, IoResult};
use ncp_stubs::config::DaemonConfig;

use crate::{models::SystemState, subsystem, version::VERSION};

/// Ensure that the state dir exists and is ready to use
async fn ensure_state_dir(state_dir: &str) -> IoResult<()> {
  let build_dir = format!("{state_dir}/build");
  fs::create_dir_all(&build_dir).await.map_err(|err| {
    err.map_err_context(|| format!("Unable to create {build_dir}"))
  })?;
  Ok(())
}

/// Init function called before http server start.
/// Connects the collaborators and starts the listeners.
pub async fn init(daemon_conf: &DaemonConfig) -> IoResult<SystemState> {
  ensure_state_dir(&daemon_conf.state_dir).await?;
  let (state, status_rx) = SystemState::new(daemon_conf).await?;
  state.jobs.init().await?;
  subsystem::init(&state, status_rx);
  log::info!("boot::init: ncprovider v{VERSION} ready");
  Ok(state)
}
