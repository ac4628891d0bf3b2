use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Information about the provider host
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HostInfo {
  pub node_name: String,
  pub operating_system: String,
  pub architecture: String,
  pub cpu_cores: usize,
  pub version: String,
  /// Accelerator models currently used by deployments in progress
  pub gpu_usage: HashMap<String, usize>,
}

/// Amounts of resources, cpu in millicores, memory and storage in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResourceAmount {
  pub cpu: i64,
  pub memory: i64,
  pub storage: i64,
  pub gpu: i64,
}

impl ResourceAmount {
  pub fn add(&mut self, other: &ResourceAmount) {
    self.cpu = self.cpu.saturating_add(other.cpu);
    self.memory = self.memory.saturating_add(other.memory);
    self.storage = self.storage.saturating_add(other.storage);
    self.gpu = self.gpu.saturating_add(other.gpu);
  }
}

/// Capacity of a cluster node and what running pods request from it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeResource {
  pub name: String,
  pub allocatable: ResourceAmount,
  pub requested: ResourceAmount,
}

/// Resource statistics of the cluster behind the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterResource {
  pub node_id: String,
  pub region: String,
  pub cluster_info: Vec<NodeResource>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn amounts_add_up() {
    let mut total = ResourceAmount {
      cpu: 500,
      memory: 1024,
      ..Default::default()
    };
    total.add(&ResourceAmount {
      cpu: 1500,
      memory: 1024,
      storage: 10,
      gpu: 1,
    });
    assert_eq!(
      total,
      ResourceAmount {
        cpu: 2000,
        memory: 2048,
        storage: 10,
        gpu: 1,
      }
    );
    total.add(&ResourceAmount {
      cpu: i64::MAX,
      ..Default::default()
    });
    assert_eq!(total.cpu, i64::MAX);
  }
}
