use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use tokio::sync::mpsc;

use ncp_stubs::job::{JobStatus, JobStatusEvent};

use crate::{models::JobStatusPublisher, vars};

impl JobStatusPublisher {
  pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobStatusEvent>) {
    Self::with_limit(capacity, vars::STATUS_TRACKED_JOBS)
  }

  pub fn with_limit(
    capacity: usize,
    limit: usize,
  ) -> (Self, mpsc::Receiver<JobStatusEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    let publisher = Self {
      tx,
      statuses: Arc::new(Mutex::new(HashMap::new())),
      limit,
    };
    (publisher, rx)
  }

  fn track(
    &self,
    statuses: &mut HashMap<String, JobStatus>,
    job_uuid: &str,
    status: JobStatus,
  ) {
    if !statuses.contains_key(job_uuid) && statuses.len() >= self.limit {
      statuses.retain(|_, tracked| !tracked.is_terminal());
      log::debug!(
        "job_status::track: {} jobs still in progress",
        statuses.len()
      );
    }
    statuses.insert(job_uuid.to_owned(), status);
  }

  fn send(&self, event: JobStatusEvent) {
    if let Err(err) = self.tx.try_send(event) {
      log::warn!("job_status::publish: event dropped {err}");
    }
  }

  /// Advance a job to `status` without waiting for delivery.
  /// Returns false when the transition would not move the job forward.
  pub fn publish(&self, job_uuid: &str, status: JobStatus) -> bool {
    {
      let mut statuses = match self.statuses.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
      };
      if let Some(current) = statuses.get(job_uuid) {
        if *current >= status {
          log::debug!(
            "job_status::publish: {job_uuid} ignoring {status} after {current}"
          );
          return false;
        }
      }
      self.track(&mut statuses, job_uuid, status);
    }
    log::debug!("job_status::publish: {job_uuid} {status}");
    self.send(JobStatusEvent {
      job_uuid: job_uuid.to_owned(),
      status,
    });
    true
  }

  /// Start the lifecycle of a job over, used when it is deployed again
  pub fn restart(&self, job_uuid: &str) {
    {
      let mut statuses = match self.statuses.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
      };
      self.track(&mut statuses, job_uuid, JobStatus::Submitted);
    }
    self.send(JobStatusEvent {
      job_uuid: job_uuid.to_owned(),
      status: JobStatus::Submitted,
    });
  }

  pub fn current(&self, job_uuid: &str) -> Option<JobStatus> {
    match self.statuses.lock() {
      Ok(guard) => guard.get(job_uuid).copied(),
      Err(poisoned) => poisoned.into_inner().get(job_uuid).copied(),
    }
  }
}
