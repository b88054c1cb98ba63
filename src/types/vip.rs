//! Virtual IP exposed by a load balancer.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Virtual IP of a load balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vip {
  pub ip_address: IpAddr,
  pub port_id: Uuid,
  pub network_id: Uuid,
}
