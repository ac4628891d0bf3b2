#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Metadata kept next to the ttl key of a running job
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeaseRecord {
  /// Tenant namespace holding the workload
  pub namespace: String,
  pub workload_name: String,
  /// Unix timestamp in seconds
  pub expire_time: i64,
  pub workload_uuid: String,
}

impl LeaseRecord {
  /// Seconds left before expiration, negative once expired
  pub fn left_time(&self, now: i64) -> i64 {
    self.expire_time - now
  }
}
