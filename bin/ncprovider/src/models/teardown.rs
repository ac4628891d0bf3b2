use std::time::Duration;

/// Cadence of the pod disappearance poll run after deletions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeardownPolicy {
  pub interval: Duration,
  pub attempts: usize,
}

impl Default for TeardownPolicy {
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(3),
      attempts: 20,
    }
  }
}
