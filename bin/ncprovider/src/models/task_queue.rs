use std::{collections::HashMap, sync::Arc};

use futures_util::lock::Mutex;
use tokio::sync::oneshot;

use ncp_error::io::IoResult;

/// Kind of work dispatched on the task queue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
  Deploy,
  Redeploy,
  Teardown,
}

impl std::fmt::Display for TaskKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      TaskKind::Deploy => write!(f, "deploy"),
      TaskKind::Redeploy => write!(f, "redeploy"),
      TaskKind::Teardown => write!(f, "teardown"),
    }
  }
}

/// Handle on a dispatched task, waiting on it never cancels the task
pub struct TaskHandle<T> {
  pub key: String,
  pub kind: TaskKind,
  pub(crate) rx: oneshot::Receiver<IoResult<T>>,
}

/// Tasks currently running, keyed by task id
#[derive(Clone, Default)]
pub struct TaskQueue {
  pub tasks: Arc<Mutex<HashMap<String, TaskKind>>>,
}
