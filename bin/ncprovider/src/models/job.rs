use std::{path::PathBuf, sync::Arc};

use futures_util::lock::Mutex;

/// Job records persisted as json files, one per job
#[derive(Clone, Debug)]
pub struct JobStore {
  pub(crate) dir: PathBuf,
  /// Serialize read modify write cycles
  pub(crate) lock: Arc<Mutex<()>>,
}
