use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

/// In-use count of every accelerator model.
/// Advisory only, it never rejects an acquisition.
#[derive(Clone, Debug, Default)]
pub struct GpuPool {
  pub(crate) inner: Arc<Mutex<HashMap<String, usize>>>,
}

/// A held accelerator slot, released exactly once when dropped
#[derive(Debug)]
pub struct GpuSlot {
  pub(crate) pool: GpuPool,
  pub(crate) model: String,
}
