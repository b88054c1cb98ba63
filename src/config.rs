//! Flow-construction configuration.
//!
//! Everything here is resolved once, when the factory is built. The driver
//! mode and retry budget select which static flow shapes get compiled; they
//! are never consulted while a flow is running.

use std::time::Duration;

use serde::Deserialize;

/// Which provisioning shape the factory compiles into every flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverMode {
  /// Generate a server certificate, persist its expiry, and hand the bundle
  /// to the compute provider at instance creation.
  CertBundled,
  /// Provision compute directly, without a certificate artifact.
  Plain,
}

/// Configuration consumed by [`AmphoraFlows`](crate::flows::AmphoraFlows).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowConfig {
  pub driver: DriverMode,
  /// Attempt budget for every wait-for-active retry loop.
  pub amp_active_retries: u32,
  /// Pause between wait-for-active attempts, in seconds.
  pub amp_active_wait_secs: u64,
}

impl Default for FlowConfig {
  fn default() -> Self {
    FlowConfig {
      driver: DriverMode::Plain,
      amp_active_retries: 30,
      amp_active_wait_secs: 2,
    }
  }
}

impl FlowConfig {
  /// Parses a configuration document from JSON.
  pub fn from_json(json: &str) -> serde_json::Result<Self> {
    serde_json::from_str(json)
  }

  pub fn amp_active_wait(&self) -> Duration {
    Duration::from_secs(self.amp_active_wait_secs)
  }
}
