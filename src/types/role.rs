//! Amphora role within a load balancer topology.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role an amphora plays for its load balancer.
///
/// Resolved when a flow is built; it selects which static marking step the
/// factory compiles in, never a runtime branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Master,
  Backup,
  Standalone,
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Role::Master => write!(f, "master"),
      Role::Backup => write!(f, "backup"),
      Role::Standalone => write!(f, "standalone"),
    }
  }
}
