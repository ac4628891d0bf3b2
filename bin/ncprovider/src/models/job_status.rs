use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use tokio::sync::mpsc;

use ncp_stubs::job::{JobStatus, JobStatusEvent};

/// Fire and forget publisher of job status transitions.
/// It keeps the current status of every job and drops transitions
/// that would move a job backwards. Past `limit` tracked jobs the
/// finished ones are forgotten.
#[derive(Clone, Debug)]
pub struct JobStatusPublisher {
  pub(crate) tx: mpsc::Sender<JobStatusEvent>,
  pub(crate) statuses: Arc<Mutex<HashMap<String, JobStatus>>>,
  pub(crate) limit: usize,
}
