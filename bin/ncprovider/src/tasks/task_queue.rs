use std::time::Duration;

use futures_util::Future;
use ntex::rt;
use tokio::sync::oneshot;

use ncp_error::io::{IoError, IoResult};

use crate::models::{TaskHandle, TaskKind, TaskQueue};

impl<T> TaskHandle<T> {
  /// Wait for the task result at most `timeout`.
  /// Giving up does not stop the task.
  pub async fn wait(self, timeout: Duration) -> IoResult<T> {
    match ntex::time::timeout(timeout, self.rx).await {
      Err(_) => Err(IoError::timed_out(
        "Task",
        format!(
          "{} {} still running after {}s",
          self.kind,
          self.key,
          timeout.as_secs()
        ),
      )),
      Ok(Err(_)) => Err(IoError::interrupted(
        "Task",
        format!("{} {} ended without result", self.kind, self.key),
      )),
      Ok(Ok(res)) => res,
    }
  }
}

impl TaskQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Run `task` in the background and return a handle on its result
  pub async fn dispatch<T, F>(&self, kind: TaskKind, task: F) -> TaskHandle<T>
  where
    F: Future<Output = IoResult<T>> + 'static,
    T: 'static,
  {
    let key = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = oneshot::channel();
    self.tasks.lock().await.insert(key.clone(), kind);
    log::debug!("task_queue::dispatch: {kind} {key}");
    let tasks = self.tasks.clone();
    let task_key = key.clone();
    rt::spawn(async move {
      let res = task.await;
      match &res {
        Ok(_) => log::debug!("task_queue::dispatch: {kind} {task_key} done"),
        Err(err) => {
          log::error!("task_queue::dispatch: {kind} {task_key} failed: {err}")
        }
      }
      tasks.lock().await.remove(&task_key);
      // The handle may have been dropped
      let _ = tx.send(res);
    });
    TaskHandle { key, kind, rx }
  }

  /// Tasks still running
  pub async fn running(&self) -> Vec<(String, TaskKind)> {
    self
      .tasks
      .lock()
      .await
      .iter()
      .map(|(key, kind)| (key.clone(), *kind))
      .collect()
  }
}
