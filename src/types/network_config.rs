//! Network configuration of a load balancer's amphorae.

use std::collections::HashMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Network attachment of one amphora within a load balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmphoraAttachment {
  pub amphora_id: Uuid,
  pub vrrp_ip: Option<IpAddr>,
  pub vrrp_port_id: Option<Uuid>,
}

/// Current network configuration for a load balancer, keyed by amphora id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
  pub vip_subnet_id: Uuid,
  pub vip_port_id: Uuid,
  pub amphorae: HashMap<Uuid, AmphoraAttachment>,
}
