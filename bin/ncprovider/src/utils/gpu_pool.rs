use std::{collections::HashMap, sync::MutexGuard};

use crate::models::{GpuPool, GpuSlot};

impl GpuPool {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
    match self.inner.lock() {
      Ok(guard) => guard,
      Err(poisoned) => poisoned.into_inner(),
    }
  }

  /// Increment the usage of a model, creating it at 1.
  /// An empty model is a no-op.
  pub fn acquire(&self, model: &str) {
    if model.is_empty() {
      return;
    }
    let mut models = self.lock();
    *models.entry(model.to_owned()).or_insert(0) += 1;
    log::debug!("gpu_pool::acquire: {model} {}", models[model]);
  }

  /// Decrement the usage of a model, the entry is removed when it reaches zero
  pub fn release(&self, model: &str) {
    if model.is_empty() {
      return;
    }
    let mut models = self.lock();
    match models.get_mut(model) {
      Some(count) if *count > 1 => {
        *count -= 1;
        log::debug!("gpu_pool::release: {model} {count}");
      }
      _ => {
        models.remove(model);
        log::debug!("gpu_pool::release: {model} 0");
      }
    }
  }

  /// Acquire a slot released when the returned guard is dropped
  pub fn acquire_slot(&self, model: &str) -> GpuSlot {
    self.acquire(model);
    GpuSlot {
      pool: self.clone(),
      model: model.to_owned(),
    }
  }

  pub fn count(&self, model: &str) -> usize {
    self.lock().get(model).copied().unwrap_or(0)
  }

  pub fn snapshot(&self) -> HashMap<String, usize> {
    self.lock().clone()
  }
}

impl GpuSlot {
  pub fn model(&self) -> &str {
    &self.model
  }
}

impl Drop for GpuSlot {
  fn drop(&mut self) {
    self.pool.release(&self.model);
  }
}
