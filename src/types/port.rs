//! Network port attached to an amphora.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Network port record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
  pub id: Uuid,
  pub network_id: Uuid,
  pub fixed_ip: Option<IpAddr>,
}
