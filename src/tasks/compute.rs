//! Work units that drive the compute provisioning collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::flow::{Outputs, TaskInputs, WorkUnit};
use crate::providers::{ComputeProvider, ProviderError, ProviderResult};
use crate::types::{ComputeStatus, FlowKey, FlowValue};

fn revert_instance(outputs: Option<&Outputs>) -> Option<uuid::Uuid> {
  outputs
    .and_then(|o| o.first())
    .and_then(|(_, v)| v.as_compute_id())
}

/// Boots a compute instance for the amphora.
pub struct CreateCompute {
  compute: Arc<dyn ComputeProvider>,
}

impl CreateCompute {
  pub fn new(compute: Arc<dyn ComputeProvider>) -> Self {
    CreateCompute { compute }
  }
}

#[async_trait]
impl WorkUnit for CreateCompute {
  fn name(&self) -> &str {
    "create-compute"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::ComputeId]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let amphora_id = inputs.amphora_id()?;
    let compute_id = self.compute.create_instance(amphora_id, None).await?;
    debug!(amphora = %amphora_id, compute = %compute_id, "requested compute instance");
    Ok(vec![(FlowKey::ComputeId, FlowValue::ComputeId(compute_id))])
  }

  async fn revert(&self, _inputs: &TaskInputs, outputs: Option<&Outputs>) -> ProviderResult<()> {
    match revert_instance(outputs) {
      Some(id) => self.compute.delete_instance(id).await,
      None => Ok(()),
    }
  }
}

/// Boots a compute instance with the server certificate bundled into the
/// boot payload.
pub struct CreateComputeWithCert {
  compute: Arc<dyn ComputeProvider>,
}

impl CreateComputeWithCert {
  pub fn new(compute: Arc<dyn ComputeProvider>) -> Self {
    CreateComputeWithCert { compute }
  }
}

#[async_trait]
impl WorkUnit for CreateComputeWithCert {
  fn name(&self) -> &str {
    "create-compute-with-cert"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId, FlowKey::ServerPem]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::ComputeId]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let amphora_id = inputs.amphora_id()?;
    let compute_id = self
      .compute
      .create_instance(amphora_id, Some(inputs.server_pem()?))
      .await?;
    debug!(
      amphora = %amphora_id,
      compute = %compute_id,
      "requested compute instance with certificate"
    );
    Ok(vec![(FlowKey::ComputeId, FlowValue::ComputeId(compute_id))])
  }

  async fn revert(&self, _inputs: &TaskInputs, outputs: Option<&Outputs>) -> ProviderResult<()> {
    match revert_instance(outputs) {
      Some(id) => self.compute.delete_instance(id).await,
      None => Ok(()),
    }
  }
}

/// Polls the instance once and fails while it is not active yet. Placed
/// inside a retry subflow, which owns the attempt budget and pacing.
pub struct WaitComputeActive {
  compute: Arc<dyn ComputeProvider>,
}

impl WaitComputeActive {
  pub fn new(compute: Arc<dyn ComputeProvider>) -> Self {
    WaitComputeActive { compute }
  }
}

#[async_trait]
impl WorkUnit for WaitComputeActive {
  fn name(&self) -> &str {
    "wait-compute-active"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::ComputeId]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::ComputeInstance]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let instance = self.compute.get_instance(inputs.compute_id()?).await?;
    match instance.status {
      ComputeStatus::Active => Ok(vec![(
        FlowKey::ComputeInstance,
        FlowValue::Compute(instance),
      )]),
      status => Err(ProviderError::new(format!(
        "compute instance {} is {status}, not active",
        instance.id
      ))),
    }
  }
}

/// Deletes the compute instance backing an amphora.
pub struct DeleteCompute {
  compute: Arc<dyn ComputeProvider>,
}

impl DeleteCompute {
  pub fn new(compute: Arc<dyn ComputeProvider>) -> Self {
    DeleteCompute { compute }
  }
}

#[async_trait]
impl WorkUnit for DeleteCompute {
  fn name(&self) -> &str {
    "delete-compute"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let amphora = inputs.amphora()?;
    let compute_id = amphora.compute_id.ok_or_else(|| {
      ProviderError::new(format!("amphora {} has no compute instance", amphora.id))
    })?;
    self.compute.delete_instance(compute_id).await?;
    debug!(amphora = %amphora.id, compute = %compute_id, "deleted compute instance");
    Ok(vec![])
  }
}
