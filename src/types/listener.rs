//! Listener configuration of a load balancer.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single listening endpoint on a load balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listener {
  pub id: Uuid,
  pub protocol: String,
  pub protocol_port: u16,
  pub enabled: bool,
}
