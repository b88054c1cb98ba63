//! Certificate authority collaborator.

use async_trait::async_trait;

use super::ProviderResult;
use crate::types::CertBundle;

/// Issues server certificates for amphora controller endpoints.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
  /// Generates a fresh key/certificate pair with an expiry timestamp. The
  /// bundle is bound to an amphora when it is attached or uploaded.
  async fn generate_server_cert(&self) -> ProviderResult<CertBundle>;
}
