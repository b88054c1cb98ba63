//! Compute instance record reported by the provisioning collaborator.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a compute instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeStatus {
  Building,
  Active,
  Error,
  Deleted,
}

impl fmt::Display for ComputeStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ComputeStatus::Building => write!(f, "building"),
      ComputeStatus::Active => write!(f, "active"),
      ComputeStatus::Error => write!(f, "error"),
      ComputeStatus::Deleted => write!(f, "deleted"),
    }
  }
}

/// Snapshot of a compute instance as polled from the provisioning collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeInstance {
  pub id: Uuid,
  pub status: ComputeStatus,
  /// Address the instance received on the management network.
  pub lb_network_ip: Option<IpAddr>,
}
