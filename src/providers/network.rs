//! Network collaborator: ports, VIPs, and failover preparation.

use async_trait::async_trait;

use super::ProviderResult;
use crate::types::{Amphora, Loadbalancer, NetworkConfig, Port};

/// Network backend the amphorae are plugged into.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
  /// Ports attached to the amphora, excluding the load balancer's primary
  /// (management) network.
  async fn ports_excluding_lb_network(&self, amphora: &Amphora) -> ProviderResult<Vec<Port>>;

  /// Detaches a failed amphora ahead of its replacement being built.
  async fn prepare_failover(&self, amphora: &Amphora) -> ProviderResult<()>;

  /// Current network configuration of the load balancer's amphorae.
  async fn network_config(&self, loadbalancer: &Loadbalancer) -> ProviderResult<NetworkConfig>;

  /// Member-facing ports to plug onto the given amphora.
  async fn member_ports(
    &self,
    loadbalancer: &Loadbalancer,
    amphora: &Amphora,
  ) -> ProviderResult<Vec<Port>>;

  async fn plug_vip(
    &self,
    loadbalancer: &Loadbalancer,
    config: &NetworkConfig,
  ) -> ProviderResult<()>;

  async fn plug_ports(&self, amphora: &Amphora, ports: &[Port]) -> ProviderResult<()>;
}
