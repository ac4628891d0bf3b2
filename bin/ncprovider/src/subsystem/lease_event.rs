use std::{sync::atomic::Ordering, time::Duration};

use futures::StreamExt;
use ntex::rt;

use ncp_error::io::IoResult;

use crate::{
  models::{KeyspaceNotification, SystemState},
  utils, vars,
};

/// Job id of an expiration event of the database `db`.
/// Events of other channels and of lease hashes are ignored.
pub fn parse_expired_key(
  notification: &KeyspaceNotification,
  db: i64,
) -> Option<String> {
  if notification.channel != format!("__keyevent@{db}__:expired") {
    return None;
  }
  let key = notification.payload.trim();
  if key.is_empty() || key.starts_with(vars::LEASE_PREFIX) {
    return None;
  }
  Some(key.to_owned())
}

/// Tear down the workload of an expired lease then drop its hash.
/// A failed teardown arms the ttl key again so the expiry is retried.
async fn exec_expired(job_uuid: &str, state: &SystemState) -> IoResult<()> {
  let record = match state.lease.read(job_uuid).await {
    Ok(record) => record,
    Err(err) if err.is_not_found() => {
      log::debug!("lease_event::exec_expired: {job_uuid} has no lease");
      return Ok(());
    }
    Err(err) => return Err(err),
  };
  log::info!(
    "lease_event::exec_expired: {job_uuid} expired, removing {} from {}",
    record.workload_uuid,
    record.namespace
  );
  if let Err(err) =
    utils::teardown::run(&record.namespace, &record.workload_uuid, state).await
  {
    match state.lease.rearm(job_uuid, vars::TEARDOWN_RETRY_SECS).await {
      Ok(_) => log::warn!(
        "lease_event::exec_expired: {job_uuid} retried in {}s",
        vars::TEARDOWN_RETRY_SECS
      ),
      Err(rearm_err) => log::error!(
        "lease_event::exec_expired: {job_uuid} cannot be retried: {rearm_err}"
      ),
    }
    return Err(err);
  }
  state.lease.remove(job_uuid).await?;
  log::info!("lease_event::exec_expired: {job_uuid} released");
  Ok(())
}

fn handle_notification(
  notification: &KeyspaceNotification,
  state: &SystemState,
) {
  let Some(job_uuid) = parse_expired_key(notification, state.lease.store.db())
  else {
    return;
  };
  let state = state.clone();
  rt::spawn(async move {
    if let Err(err) = exec_expired(&job_uuid, &state).await {
      log::warn!("lease_event::handle_notification: {job_uuid}: {err}");
    }
  });
}

async fn listen(state: &SystemState) -> IoResult<()> {
  let mut stream = state.lease.store.subscribe_expired().await?;
  log::info!("lease_event::listen: stream connected");
  while let Some(notification) = stream.next().await {
    match notification {
      Ok(notification) => handle_notification(&notification, state),
      Err(err) => log::warn!("lease_event::listen: {err}"),
    }
  }
  Ok(())
}

/// Create a new thread with its own loop listening to lease expirations.
/// Only the first call starts a listener.
pub fn spawn(state: &SystemState) {
  if state.lease.listening.swap(true, Ordering::SeqCst) {
    return;
  }
  let state = state.clone();
  rt::Arbiter::new().exec_fn(move || {
    rt::spawn(async move {
      loop {
        if let Err(err) = listen(&state).await {
          log::warn!("lease_event::spawn: {err}");
        }
        log::warn!("lease_event::spawn: disconnected trying to reconnect");
        ntex::time::sleep(Duration::from_secs(1)).await;
      }
    });
  });
}
