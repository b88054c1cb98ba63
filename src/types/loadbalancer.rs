//! Load balancer database record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Listener, Vip};

/// Load balancer record as held by the database collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loadbalancer {
  pub id: Uuid,
  pub name: String,
  pub vip: Vip,
  pub listeners: Vec<Listener>,
}
