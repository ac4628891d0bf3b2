use std::{
  pin::Pin,
  sync::{atomic::AtomicBool, Arc},
};

use async_trait::async_trait;
use futures::Stream;

use ncp_error::io::IoResult;

/// A message received on the keyspace notification channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyspaceNotification {
  pub channel: String,
  pub payload: String,
}

pub type KeyEventStream =
  Pin<Box<dyn Stream<Item = IoResult<KeyspaceNotification>>>>;

/// Expiring key value store with keyspace notifications
#[async_trait(?Send)]
pub trait LeaseStore: Send + Sync {
  /// Database index, used to build the notification channel name
  fn db(&self) -> i64;

  async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> IoResult<()>;

  async fn hset(&self, key: &str, fields: &[(&str, String)]) -> IoResult<()>;

  async fn hmget(
    &self,
    key: &str,
    fields: &[&str],
  ) -> IoResult<Vec<Option<String>>>;

  async fn del(&self, key: &str) -> IoResult<()>;

  /// Subscribe to key expiration events of the database
  async fn subscribe_expired(&self) -> IoResult<KeyEventStream>;
}

/// Lease lifecycle of running jobs
#[derive(Clone)]
pub struct LeaseTracker {
  pub store: Arc<dyn LeaseStore>,
  /// Set once the expiration listener is running
  pub(crate) listening: Arc<AtomicBool>,
}

impl LeaseTracker {
  pub fn new(store: Arc<dyn LeaseStore>) -> Self {
    Self {
      store,
      listening: Arc::new(AtomicBool::new(false)),
    }
  }
}
