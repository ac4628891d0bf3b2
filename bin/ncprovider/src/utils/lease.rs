use ncp_error::io::{IoError, IoResult};
use ncp_stubs::lease::LeaseRecord;

use crate::{models::LeaseTracker, vars};

const NAMESPACE: &str = "namespace";
const WORKLOAD_NAME: &str = "workload_name";
const EXPIRE_TIME: &str = "expire_time";
const WORKLOAD_UUID: &str = "workload_uuid";

/// Key of the hash holding the lease of a job
pub fn hash_key(job_uuid: &str) -> String {
  format!("{}{job_uuid}", vars::LEASE_PREFIX)
}

fn now() -> i64 {
  chrono::Utc::now().timestamp()
}

/// Lease seconds as a signed offset, values past `i64::MAX` are rejected
pub fn seconds(job_uuid: &str, duration: u64) -> IoResult<i64> {
  i64::try_from(duration).map_err(|_| {
    IoError::invalid_input(
      "Lease",
      format!("duration {duration} of {job_uuid} is out of range"),
    )
  })
}

fn overflow(job_uuid: &str) -> IoError {
  IoError::invalid_input(
    "Lease",
    format!("expire time of {job_uuid} is out of range"),
  )
}

fn to_fields(record: &LeaseRecord) -> Vec<(&'static str, String)> {
  vec![
    (NAMESPACE, record.namespace.clone()),
    (WORKLOAD_NAME, record.workload_name.clone()),
    (EXPIRE_TIME, record.expire_time.to_string()),
    (WORKLOAD_UUID, record.workload_uuid.clone()),
  ]
}

impl LeaseTracker {
  async fn write(
    &self,
    job_uuid: &str,
    record: &LeaseRecord,
    ttl: u64,
  ) -> IoResult<()> {
    self
      .store
      .set_ex(job_uuid, vars::LEASE_SENTINEL, ttl.max(1))
      .await?;
    self.store.hset(&hash_key(job_uuid), &to_fields(record)).await?;
    Ok(())
  }

  /// Arm a lease of `duration` seconds for a job
  pub async fn register(
    &self,
    job_uuid: &str,
    namespace: &str,
    workload_name: &str,
    workload_uuid: &str,
    duration: u64,
  ) -> IoResult<LeaseRecord> {
    self
      .register_at(
        job_uuid,
        namespace,
        workload_name,
        workload_uuid,
        duration,
        now(),
      )
      .await
  }

  pub async fn register_at(
    &self,
    job_uuid: &str,
    namespace: &str,
    workload_name: &str,
    workload_uuid: &str,
    duration: u64,
    now: i64,
  ) -> IoResult<LeaseRecord> {
    if duration == 0 {
      return Err(IoError::invalid_input(
        "Lease",
        format!("duration of {job_uuid} must be positive"),
      ));
    }
    let expire_time = now
      .checked_add(seconds(job_uuid, duration)?)
      .ok_or_else(|| overflow(job_uuid))?;
    let record = LeaseRecord {
      namespace: namespace.to_owned(),
      workload_name: workload_name.to_owned(),
      expire_time,
      workload_uuid: workload_uuid.to_owned(),
    };
    self.write(job_uuid, &record, duration).await?;
    log::info!(
      "lease::register: {job_uuid} expires at {}",
      record.expire_time
    );
    Ok(record)
  }

  /// Read the lease of a job, missing or unreadable fields are `NotFound`
  pub async fn read(&self, job_uuid: &str) -> IoResult<LeaseRecord> {
    let values = self
      .store
      .hmget(
        &hash_key(job_uuid),
        &[NAMESPACE, WORKLOAD_NAME, EXPIRE_TIME, WORKLOAD_UUID],
      )
      .await?;
    let not_found =
      || IoError::not_found("Lease", format!("{job_uuid} has no lease"));
    let fields: [Option<String>; 4] =
      values.try_into().map_err(|_| not_found())?;
    let [namespace, workload_name, expire_time, workload_uuid] = fields;
    let expire_time =
      expire_time.and_then(|time| time.trim().parse::<i64>().ok());
    match (namespace, workload_name, expire_time, workload_uuid) {
      (
        Some(namespace),
        Some(workload_name),
        Some(expire_time),
        Some(workload_uuid),
      ) => Ok(LeaseRecord {
        namespace,
        workload_name,
        expire_time,
        workload_uuid,
      }),
      _ => Err(not_found()),
    }
  }

  /// Extend the lease of a job by `extension` seconds
  pub async fn renew(
    &self,
    job_uuid: &str,
    extension: u64,
  ) -> IoResult<LeaseRecord> {
    self.renew_at(job_uuid, extension, now()).await
  }

  /// New expiry is `now + left + extension` where `left` is the time the
  /// lease had left. An expired or missing lease is rejected untouched.
  pub async fn renew_at(
    &self,
    job_uuid: &str,
    extension: u64,
    now: i64,
  ) -> IoResult<LeaseRecord> {
    let record = self.read(job_uuid).await?;
    let left = record.left_time(now);
    if left < 0 {
      return Err(IoError::not_found(
        "Lease",
        format!("{job_uuid} expired {} seconds ago", -left),
      ));
    }
    let total = left
      .checked_add(seconds(job_uuid, extension)?)
      .ok_or_else(|| overflow(job_uuid))?;
    let expire_time =
      now.checked_add(total).ok_or_else(|| overflow(job_uuid))?;
    let ttl = u64::try_from(total).map_err(|_| overflow(job_uuid))?;
    let renewed = LeaseRecord {
      expire_time,
      ..record
    };
    self.write(job_uuid, &renewed, ttl).await?;
    log::info!(
      "lease::renew: {job_uuid} expires at {}",
      renewed.expire_time
    );
    Ok(renewed)
  }

  /// Arm the ttl key of a job again so its expiry fires once more after
  /// `ttl` seconds, the hash is left as is
  pub async fn rearm(&self, job_uuid: &str, ttl: u64) -> IoResult<()> {
    self
      .store
      .set_ex(job_uuid, vars::LEASE_SENTINEL, ttl.max(1))
      .await?;
    log::info!("lease::rearm: {job_uuid} expires again in {ttl} seconds");
    Ok(())
  }

  /// Remove the residual hash of an expired lease
  pub async fn remove(&self, job_uuid: &str) -> IoResult<()> {
    self.store.del(&hash_key(job_uuid)).await
  }
}
