use ntex::rt;
use tokio::sync::mpsc;

use ncp_stubs::job::JobStatusEvent;

use crate::models::SystemState;

/// Apply every published status transition to the job records
pub fn spawn(state: &SystemState, mut rx: mpsc::Receiver<JobStatusEvent>) {
  let jobs = state.jobs.clone();
  rt::spawn(async move {
    while let Some(event) = rx.recv().await {
      match jobs.update_status(&event.job_uuid, event.status).await {
        Ok(job) => {
          log::debug!("job_status::spawn: {} is {}", job.uuid, job.status)
        }
        Err(err) => log::warn!("job_status::spawn: {err}"),
      }
    }
    log::info!("job_status::spawn: status channel closed");
  });
}
