//! Work units that drive the network collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::flow::{Outputs, TaskInputs, WorkUnit};
use crate::providers::{NetworkProvider, ProviderResult};
use crate::types::{FlowKey, FlowValue};

/// Captures the ports attached to the amphora, excluding the load balancer's
/// primary network.
pub struct ListPortsExcludingLbNetwork {
  network: Arc<dyn NetworkProvider>,
}

impl ListPortsExcludingLbNetwork {
  pub fn new(network: Arc<dyn NetworkProvider>) -> Self {
    ListPortsExcludingLbNetwork { network }
  }
}

#[async_trait]
impl WorkUnit for ListPortsExcludingLbNetwork {
  fn name(&self) -> &str {
    "list-ports-excluding-lb-network"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::Ports]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let ports = self
      .network
      .ports_excluding_lb_network(inputs.amphora()?)
      .await?;
    debug!(count = ports.len(), "captured amphora ports");
    Ok(vec![(FlowKey::Ports, FlowValue::Ports(ports))])
  }
}

/// Detaches a failed amphora ahead of building its replacement.
pub struct PrepareFailover {
  network: Arc<dyn NetworkProvider>,
}

impl PrepareFailover {
  pub fn new(network: Arc<dyn NetworkProvider>) -> Self {
    PrepareFailover { network }
  }
}

#[async_trait]
impl WorkUnit for PrepareFailover {
  fn name(&self) -> &str {
    "prepare-failover"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self.network.prepare_failover(inputs.amphora()?).await?;
    Ok(vec![])
  }
}

/// Fetches the current network configuration of the load balancer's amphorae.
pub struct FetchNetworkConfig {
  network: Arc<dyn NetworkProvider>,
}

impl FetchNetworkConfig {
  pub fn new(network: Arc<dyn NetworkProvider>) -> Self {
    FetchNetworkConfig { network }
  }
}

#[async_trait]
impl WorkUnit for FetchNetworkConfig {
  fn name(&self) -> &str {
    "fetch-network-config"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Loadbalancer]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::NetworkConfig]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let config = self.network.network_config(inputs.loadbalancer()?).await?;
    Ok(vec![(
      FlowKey::NetworkConfig,
      FlowValue::NetworkConfig(config),
    )])
  }
}

/// Fetches the member-facing ports to plug onto the given amphora.
pub struct ListMemberPorts {
  network: Arc<dyn NetworkProvider>,
}

impl ListMemberPorts {
  pub fn new(network: Arc<dyn NetworkProvider>) -> Self {
    ListMemberPorts { network }
  }
}

#[async_trait]
impl WorkUnit for ListMemberPorts {
  fn name(&self) -> &str {
    "list-member-ports"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Loadbalancer, FlowKey::Amphora]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::MemberPorts]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let ports = self
      .network
      .member_ports(inputs.loadbalancer()?, inputs.amphora()?)
      .await?;
    Ok(vec![(FlowKey::MemberPorts, FlowValue::Ports(ports))])
  }
}

/// Plugs the VIP onto the load balancer's amphorae.
pub struct PlugVip {
  network: Arc<dyn NetworkProvider>,
}

impl PlugVip {
  pub fn new(network: Arc<dyn NetworkProvider>) -> Self {
    PlugVip { network }
  }
}

#[async_trait]
impl WorkUnit for PlugVip {
  fn name(&self) -> &str {
    "plug-vip"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Loadbalancer, FlowKey::NetworkConfig]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .network
      .plug_vip(inputs.loadbalancer()?, inputs.network_config()?)
      .await?;
    Ok(vec![])
  }
}

/// Plugs a list of ports onto an amphora.
pub struct PlugPorts {
  network: Arc<dyn NetworkProvider>,
}

impl PlugPorts {
  pub fn new(network: Arc<dyn NetworkProvider>) -> Self {
    PlugPorts { network }
  }
}

#[async_trait]
impl WorkUnit for PlugPorts {
  fn name(&self) -> &str {
    "plug-ports"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora, FlowKey::Ports]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .network
      .plug_ports(inputs.amphora()?, inputs.ports()?)
      .await?;
    Ok(vec![])
  }
}
