use tokio::sync::mpsc;

use ncp_stubs::job::JobStatusEvent;

use crate::models::SystemState;

pub mod job_status;
pub mod lease_event;

/// Start the long lived listeners of the daemon
pub fn init(state: &SystemState, status_rx: mpsc::Receiver<JobStatusEvent>) {
  job_status::spawn(state, status_rx);
  lease_event::spawn(state);
}
