//! Per-amphora network details computed during failover.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// VIP-related network data for one amphora, as written back after failover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmphoraNetworkDetail {
  pub amphora_id: Uuid,
  pub vip_ip: Option<IpAddr>,
  pub ha_port_id: Option<Uuid>,
}
