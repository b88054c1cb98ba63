//! Compute provisioning collaborator.

use async_trait::async_trait;
use uuid::Uuid;

use super::ProviderResult;
use crate::types::{CertBundle, ComputeInstance};

/// Compute backend that hosts amphora instances.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
  /// Boots an instance for the amphora, optionally with a certificate bundle
  /// injected into the boot payload. Returns the instance id.
  async fn create_instance(
    &self,
    amphora_id: Uuid,
    cert: Option<&CertBundle>,
  ) -> ProviderResult<Uuid>;

  /// Polls the current instance record. Callers decide whether its status is
  /// good enough.
  async fn get_instance(&self, compute_id: Uuid) -> ProviderResult<ComputeInstance>;

  async fn delete_instance(&self, compute_id: Uuid) -> ProviderResult<()>;
}
