//! Appliance runtime control collaborator.

use async_trait::async_trait;

use super::ProviderResult;
use crate::types::{Amphora, CertBundle, Listener, Vip};

/// Control channel to the software running inside an amphora.
#[async_trait]
pub trait ApplianceDriver: Send + Sync {
  /// Pushes boot/finalize configuration to a freshly provisioned amphora.
  async fn finalize(&self, amphora: &Amphora) -> ProviderResult<()>;

  /// Uploads a rotated certificate to a running amphora.
  async fn upload_cert(&self, amphora: &Amphora, cert: &CertBundle) -> ProviderResult<()>;

  async fn update_listeners(&self, listeners: &[Listener], vip: &Vip) -> ProviderResult<()>;

  async fn start_listeners(&self, listeners: &[Listener], vip: &Vip) -> ProviderResult<()>;
}
