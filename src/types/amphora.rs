//! Amphora database record.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Provisioning state of an amphora record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmphoraStatus {
  Booting,
  Allocated,
  Ready,
  PendingDelete,
  Deleted,
  Error,
}

impl fmt::Display for AmphoraStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AmphoraStatus::Booting => write!(f, "booting"),
      AmphoraStatus::Allocated => write!(f, "allocated"),
      AmphoraStatus::Ready => write!(f, "ready"),
      AmphoraStatus::PendingDelete => write!(f, "pending_delete"),
      AmphoraStatus::Deleted => write!(f, "deleted"),
      AmphoraStatus::Error => write!(f, "error"),
    }
  }
}

/// Amphora record as held by the database collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amphora {
  pub id: Uuid,
  /// Compute instance backing this amphora, once one has been provisioned.
  pub compute_id: Option<Uuid>,
  pub status: AmphoraStatus,
  pub role: Option<Role>,
  /// Load balancer this amphora is allocated to; `None` for spares.
  pub loadbalancer_id: Option<Uuid>,
  /// Address on the management network, filled in from the compute record.
  pub lb_network_ip: Option<IpAddr>,
  pub cert_expiration: Option<DateTime<Utc>>,
  pub cert_busy: bool,
}
