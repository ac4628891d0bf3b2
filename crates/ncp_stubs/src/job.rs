#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle of a job, in the only order it can advance
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JobStatus {
  #[default]
  Submitted,
  DownloadingSource,
  PullingImage,
  DeployedToCluster,
  ResultUploaded,
}

impl JobStatus {
  pub fn is_terminal(&self) -> bool {
    *self == JobStatus::ResultUploaded
  }
}

impl std::fmt::Display for JobStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      JobStatus::Submitted => "submitted",
      JobStatus::DownloadingSource => "downloading_source",
      JobStatus::PullingImage => "pulling_image",
      JobStatus::DeployedToCluster => "deployed_to_cluster",
      JobStatus::ResultUploaded => "result_uploaded",
    };
    write!(f, "{s}")
  }
}

impl std::str::FromStr for JobStatus {
  type Err = std::io::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "submitted" => Ok(JobStatus::Submitted),
      "downloading_source" => Ok(JobStatus::DownloadingSource),
      "pulling_image" => Ok(JobStatus::PullingImage),
      "deployed_to_cluster" => Ok(JobStatus::DeployedToCluster),
      "result_uploaded" => Ok(JobStatus::ResultUploaded),
      _ => Err(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("Invalid job status {s}"),
      )),
    }
  }
}

/// A status transition emitted for a job
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JobStatusEvent {
  pub job_uuid: String,
  pub status: JobStatus,
}

/// Payload received to run or redeploy a job
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JobPartial {
  pub uuid: String,
  #[cfg_attr(feature = "serde", serde(default))]
  pub name: String,
  /// Lease duration in seconds
  pub duration: u64,
  pub job_source_uri: String,
  /// Result of a previous run, used on redeploy to keep the same host
  #[cfg_attr(
    feature = "serde",
    serde(default, skip_serializing_if = "Option::is_none")
  )]
  pub job_result_uri: Option<String>,
  #[cfg_attr(feature = "serde", serde(default))]
  pub storage_source: String,
  #[cfg_attr(feature = "serde", serde(default))]
  pub task_uuid: String,
}

/// A job as recorded by the provider
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Job {
  pub uuid: String,
  pub name: String,
  pub status: JobStatus,
  pub duration: u64,
  pub job_source_uri: String,
  pub job_result_uri: String,
  pub storage_source: String,
  pub task_uuid: String,
  /// Host routed to the workload by the ingress
  pub host_name: String,
  #[cfg_attr(feature = "serde", serde(default))]
  pub creator_wallet: String,
  #[cfg_attr(feature = "serde", serde(default))]
  pub space_uuid: String,
  /// Unix timestamp in seconds
  pub created_at: i64,
  /// Unix timestamp in seconds
  pub updated_at: i64,
}

impl Job {
  pub fn from_partial(partial: JobPartial, host_name: &str, now: i64) -> Self {
    Self {
      uuid: partial.uuid,
      name: partial.name,
      status: JobStatus::Submitted,
      duration: partial.duration,
      job_source_uri: partial.job_source_uri,
      job_result_uri: String::default(),
      storage_source: partial.storage_source,
      task_uuid: partial.task_uuid,
      host_name: host_name.to_owned(),
      creator_wallet: String::default(),
      space_uuid: String::default(),
      created_at: now,
      updated_at: now,
    }
  }
}

/// Payload to extend the lease of a running job
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JobRenew {
  pub job_uuid: String,
  /// Extension in seconds
  pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JobRenewResponse {
  pub status: String,
  #[cfg_attr(
    feature = "serde",
    serde(default, skip_serializing_if = "Option::is_none")
  )]
  pub message: Option<String>,
  #[cfg_attr(
    feature = "serde",
    serde(default, skip_serializing_if = "Option::is_none")
  )]
  pub expire_time: Option<i64>,
}

/// Query of an explicit job deletion
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JobDeleteQuery {
  #[cfg_attr(feature = "serde", serde(default))]
  pub creator_wallet: String,
  #[cfg_attr(feature = "serde", serde(default))]
  pub space_uuid: String,
}
