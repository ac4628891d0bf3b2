#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A quantity with its unit token as written in a hardware description
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Specification {
  pub quantity: i64,
  pub unit: String,
}

impl Specification {
  pub fn new<T>(quantity: i64, unit: T) -> Self
  where
    T: Into<String>,
  {
    Self {
      quantity,
      unit: unit.into(),
    }
  }
}

/// Hardware entitlements of a workload
/// A gpu quantity of 0 always comes with an empty unit
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceSpec {
  pub cpu: Specification,
  pub memory: Specification,
  pub gpu: Specification,
  pub storage: Specification,
}

impl ResourceSpec {
  pub fn has_gpu(&self) -> bool {
    self.gpu.quantity > 0 && !self.gpu.unit.is_empty()
  }

  /// Name used to account the accelerator model and to label cluster nodes
  /// `NVIDIA RTX 3090` becomes `NVIDIA-RTX-3090`
  pub fn gpu_model(&self) -> Option<String> {
    if !self.has_gpu() {
      return None;
    }
    Some(self.gpu.unit.replace(' ', "-"))
  }
}
