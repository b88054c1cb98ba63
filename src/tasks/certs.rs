//! Work units that drive the certificate authority.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::flow::{Outputs, TaskInputs, WorkUnit};
use crate::providers::{CertificateAuthority, ProviderResult};
use crate::types::{FlowKey, FlowValue};

/// Generates a fresh server certificate bundle for an amphora.
pub struct GenerateServerCert {
  certs: Arc<dyn CertificateAuthority>,
}

impl GenerateServerCert {
  pub fn new(certs: Arc<dyn CertificateAuthority>) -> Self {
    GenerateServerCert { certs }
  }
}

#[async_trait]
impl WorkUnit for GenerateServerCert {
  fn name(&self) -> &str {
    "generate-server-cert"
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::ServerPem]
  }

  async fn execute(&self, _inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let bundle = self.certs.generate_server_cert().await?;
    debug!(expires_at = %bundle.expires_at, "generated server certificate");
    Ok(vec![(FlowKey::ServerPem, FlowValue::ServerPem(bundle))])
  }
}
