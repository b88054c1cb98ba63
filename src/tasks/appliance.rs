//! Work units that drive the appliance runtime control collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::flow::{Outputs, TaskInputs, WorkUnit};
use crate::providers::{ApplianceDriver, ProviderResult};
use crate::types::FlowKey;

/// Pushes boot/finalize configuration to a freshly provisioned amphora.
pub struct FinalizeAmphora {
  appliance: Arc<dyn ApplianceDriver>,
}

impl FinalizeAmphora {
  pub fn new(appliance: Arc<dyn ApplianceDriver>) -> Self {
    FinalizeAmphora { appliance }
  }
}

#[async_trait]
impl WorkUnit for FinalizeAmphora {
  fn name(&self) -> &str {
    "finalize-amphora"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let amphora = inputs.amphora()?;
    self.appliance.finalize(amphora).await?;
    info!(amphora = %amphora.id, "pushed boot configuration");
    Ok(vec![])
  }
}

/// Uploads a rotated certificate to a running amphora.
pub struct UploadCert {
  appliance: Arc<dyn ApplianceDriver>,
}

impl UploadCert {
  pub fn new(appliance: Arc<dyn ApplianceDriver>) -> Self {
    UploadCert { appliance }
  }
}

#[async_trait]
impl WorkUnit for UploadCert {
  fn name(&self) -> &str {
    "upload-cert"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora, FlowKey::ServerPem]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let amphora = inputs.amphora()?;
    self
      .appliance
      .upload_cert(amphora, inputs.server_pem()?)
      .await?;
    debug!(amphora = %amphora.id, "uploaded rotated certificate");
    Ok(vec![])
  }
}

/// Points the listener configuration at the current amphorae.
pub struct UpdateListeners {
  appliance: Arc<dyn ApplianceDriver>,
}

impl UpdateListeners {
  pub fn new(appliance: Arc<dyn ApplianceDriver>) -> Self {
    UpdateListeners { appliance }
  }
}

#[async_trait]
impl WorkUnit for UpdateListeners {
  fn name(&self) -> &str {
    "update-listeners"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Listeners, FlowKey::Vip]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .appliance
      .update_listeners(inputs.listeners()?, inputs.vip()?)
      .await?;
    Ok(vec![])
  }
}

/// Starts the listeners once the replacement amphora is plugged in.
pub struct StartListeners {
  appliance: Arc<dyn ApplianceDriver>,
}

impl StartListeners {
  pub fn new(appliance: Arc<dyn ApplianceDriver>) -> Self {
    StartListeners { appliance }
  }
}

#[async_trait]
impl WorkUnit for StartListeners {
  fn name(&self) -> &str {
    "start-listeners"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Listeners, FlowKey::Vip]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .appliance
      .start_listeners(inputs.listeners()?, inputs.vip()?)
      .await?;
    Ok(vec![])
  }
}
