use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::lock::Mutex;

use ncp_error::io::{FromIo, IoError, IoResult};
use ncp_stubs::job::{Job, JobStatus};

use crate::models::JobStore;

fn now() -> i64 {
  chrono::Utc::now().timestamp()
}

impl JobStore {
  /// Records live under `<state_dir>/jobs`
  pub fn new(state_dir: &str) -> Self {
    Self {
      dir: Path::new(state_dir).join("jobs"),
      lock: Arc::new(Mutex::new(())),
    }
  }

  pub async fn init(&self) -> IoResult<()> {
    tokio::fs::create_dir_all(&self.dir)
      .await
      .map_err(|err| err.map_err_context(|| self.dir.display().to_string()))?;
    Ok(())
  }

  fn path(&self, job_uuid: &str) -> IoResult<PathBuf> {
    let valid = !job_uuid.is_empty()
      && job_uuid
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
      return Err(IoError::invalid_input(
        "JobStore",
        format!("'{job_uuid}' is not a valid job id"),
      ));
    }
    Ok(self.dir.join(format!("{job_uuid}.json")))
  }

  async fn read_unlocked(&self, job_uuid: &str) -> IoResult<Job> {
    let path = self.path(job_uuid)?;
    let content = tokio::fs::read(&path)
      .await
      .map_err(|err| err.map_err_context(|| format!("Job {job_uuid}")))?;
    let job = serde_json::from_slice::<Job>(&content)
      .map_err(|err| err.map_err_context(|| format!("Job {job_uuid}")))?;
    Ok(job)
  }

  async fn write_unlocked(&self, job: &Job) -> IoResult<()> {
    let path = self.path(&job.uuid)?;
    self.init().await?;
    let content = serde_json::to_vec_pretty(job)
      .map_err(|err| err.map_err_context(|| format!("Job {}", job.uuid)))?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content)
      .await
      .map_err(|err| err.map_err_context(|| tmp.display().to_string()))?;
    tokio::fs::rename(&tmp, &path)
      .await
      .map_err(|err| err.map_err_context(|| path.display().to_string()))?;
    Ok(())
  }

  async fn update<F>(&self, job_uuid: &str, apply: F) -> IoResult<Job>
  where
    F: FnOnce(&mut Job),
  {
    let _guard = self.lock.lock().await;
    let mut job = self.read_unlocked(job_uuid).await?;
    apply(&mut job);
    job.updated_at = now();
    self.write_unlocked(&job).await?;
    Ok(job)
  }

  /// Create or replace the record of a job
  pub async fn save(&self, job: &Job) -> IoResult<()> {
    let _guard = self.lock.lock().await;
    self.write_unlocked(job).await
  }

  pub async fn read(&self, job_uuid: &str) -> IoResult<Job> {
    let _guard = self.lock.lock().await;
    self.read_unlocked(job_uuid).await
  }

  pub async fn update_status(
    &self,
    job_uuid: &str,
    status: JobStatus,
  ) -> IoResult<Job> {
    self.update(job_uuid, |job| job.status = status).await
  }

  /// Record where and for whom a job was deployed
  pub async fn update_deployment(
    &self,
    job_uuid: &str,
    host: &str,
    creator_wallet: &str,
    space_uuid: &str,
  ) -> IoResult<Job> {
    self
      .update(job_uuid, |job| {
        job.host_name = host.to_owned();
        job.creator_wallet = creator_wallet.to_owned();
        job.space_uuid = space_uuid.to_owned();
        job.job_result_uri = format!("https://{host}");
      })
      .await
  }
}
