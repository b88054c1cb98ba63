//! Work unit contract and the typed input view handed to each unit.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::providers::{ProviderError, ProviderResult};
use crate::types::{
  Amphora, AmphoraNetworkDetail, CertBundle, ComputeInstance, FlowKey, FlowValue, Listener,
  Loadbalancer, NetworkConfig, Port, Vip,
};

/// Values a unit produced, keyed by its natural `provides` names.
pub type Outputs = Vec<(FlowKey, FlowValue)>;

/// An atomic named operation inside a flow.
///
/// Units declare the keys they consume and produce; the builder validates
/// provenance against those declarations before execution. `execute` delegates
/// to a collaborator and fails with whatever the collaborator reports; the
/// core never decides whether a failure is transient. `revert` is the
/// best-effort compensating action: its own failure is logged, never
/// re-raised, so it cannot mask the error that triggered it.
#[async_trait]
pub trait WorkUnit: Send + Sync {
  /// Natural unit name; placements may override it with a prefixed instance
  /// name.
  fn name(&self) -> &str;

  fn requires(&self) -> &[FlowKey] {
    &[]
  }

  fn provides(&self) -> &[FlowKey] {
    &[]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs>;

  async fn revert(&self, _inputs: &TaskInputs, _outputs: Option<&Outputs>) -> ProviderResult<()> {
    Ok(())
  }
}

/// Input view for one unit execution, keyed by the unit's natural names.
///
/// The executor resolves any rebinds before building this, so a unit always
/// reads the keys it declared regardless of where the values live in the
/// store.
#[derive(Debug, Clone, Default)]
pub struct TaskInputs {
  values: HashMap<FlowKey, FlowValue>,
}

impl TaskInputs {
  pub fn new(values: HashMap<FlowKey, FlowValue>) -> Self {
    TaskInputs { values }
  }

  pub fn value(&self, key: FlowKey) -> ProviderResult<&FlowValue> {
    self
      .values
      .get(&key)
      .ok_or_else(|| ProviderError::new(format!("required input `{key}` missing")))
  }

  fn typed<'a, T>(
    &'a self,
    key: FlowKey,
    pick: impl FnOnce(&'a FlowValue) -> Option<T>,
    wanted: &str,
  ) -> ProviderResult<T> {
    let value = self.value(key)?;
    pick(value).ok_or_else(|| {
      ProviderError::new(format!(
        "input `{key}` holds {}, expected {wanted}",
        value.kind()
      ))
    })
  }

  pub fn amphora_id(&self) -> ProviderResult<uuid::Uuid> {
    self.typed(FlowKey::AmphoraId, FlowValue::as_amphora_id, "an amphora id")
  }

  pub fn compute_id(&self) -> ProviderResult<uuid::Uuid> {
    self.typed(FlowKey::ComputeId, FlowValue::as_compute_id, "a compute id")
  }

  pub fn loadbalancer_id(&self) -> ProviderResult<uuid::Uuid> {
    self.typed(
      FlowKey::LoadbalancerId,
      FlowValue::as_loadbalancer_id,
      "a load balancer id",
    )
  }

  pub fn server_pem(&self) -> ProviderResult<&CertBundle> {
    self.typed(
      FlowKey::ServerPem,
      FlowValue::as_server_pem,
      "a certificate bundle",
    )
  }

  pub fn compute(&self) -> ProviderResult<&ComputeInstance> {
    self.typed(
      FlowKey::ComputeInstance,
      FlowValue::as_compute,
      "a compute instance",
    )
  }

  pub fn amphora(&self) -> ProviderResult<&Amphora> {
    self.typed(FlowKey::Amphora, FlowValue::as_amphora, "an amphora record")
  }

  pub fn loadbalancer(&self) -> ProviderResult<&Loadbalancer> {
    self.typed(
      FlowKey::Loadbalancer,
      FlowValue::as_loadbalancer,
      "a load balancer record",
    )
  }

  pub fn ports(&self) -> ProviderResult<&[Port]> {
    self.typed(FlowKey::Ports, FlowValue::as_ports, "a port list")
  }

  pub fn amps_data(&self) -> ProviderResult<&[AmphoraNetworkDetail]> {
    self.typed(
      FlowKey::AmpsData,
      FlowValue::as_amps_data,
      "failover network details",
    )
  }

  pub fn network_config(&self) -> ProviderResult<&NetworkConfig> {
    self.typed(
      FlowKey::NetworkConfig,
      FlowValue::as_network_config,
      "a network configuration",
    )
  }

  pub fn listeners(&self) -> ProviderResult<&[Listener]> {
    self.typed(FlowKey::Listeners, FlowValue::as_listeners, "a listener list")
  }

  pub fn vip(&self) -> ProviderResult<&Vip> {
    self.typed(FlowKey::Vip, FlowValue::as_vip, "a vip")
  }
}
