#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// File of a workload as listed by the workload source
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpaceFile {
  pub name: String,
  pub url: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpaceHardware {
  /// Free text like `Nvidia RTX 3090 · CPU 8 vCPU · Memory 32 GB`
  pub description: String,
  pub hardware_type: String,
  pub memory: i64,
  pub name: String,
  pub vcpu: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpaceActiveOrder {
  pub config: SpaceHardware,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Space {
  pub name: String,
  pub uuid: String,
  #[cfg_attr(feature = "serde", serde(rename = "activeOrder"))]
  pub active_order: SpaceActiveOrder,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpaceOwner {
  pub public_address: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpaceData {
  pub files: Vec<SpaceFile>,
  pub owner: SpaceOwner,
  pub space: Space,
}

/// Document served by the workload source uri of a job
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpaceJson {
  pub data: SpaceData,
  #[cfg_attr(feature = "serde", serde(default))]
  pub message: String,
  #[cfg_attr(feature = "serde", serde(default))]
  pub status: String,
}

impl SpaceJson {
  /// Owner wallet, lower cased as used in namespace names
  pub fn creator_wallet(&self) -> String {
    self.data.owner.public_address.to_lowercase()
  }

  pub fn workload_name(&self) -> String {
    self.data.space.name.to_lowercase()
  }

  pub fn workload_uuid(&self) -> String {
    self.data.space.uuid.to_lowercase()
  }

  pub fn hardware_description(&self) -> &str {
    &self.data.space.active_order.config.description
  }
}

/// Document served by the result uri of a previous run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JobResultHost {
  pub job_result_uri: String,
}
