//! Symbolic keys for values threaded through a flow execution.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Symbolic key for a value in the per-execution [`DataStore`](crate::flow::DataStore).
///
/// Work units declare which keys they require and provide; the builder checks
/// provenance against these declarations before a flow can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowKey {
  /// Database id of the amphora a flow is working on.
  AmphoraId,
  /// Result of the spare-amphora lookup: an amphora id, or absent.
  SpareAmphoraId,
  /// Compute-instance id backing an amphora.
  ComputeId,
  /// Compute instance record as reported by the provisioning collaborator.
  ComputeInstance,
  /// Freshly generated server certificate bundle.
  ServerPem,
  /// Authoritative amphora record.
  Amphora,
  /// Replacement amphora record during failover, kept distinct from [`FlowKey::Amphora`].
  FailoverAmphora,
  /// Id of the owning load balancer.
  LoadbalancerId,
  /// Authoritative load balancer record.
  Loadbalancer,
  /// Network ports attached to an amphora.
  Ports,
  /// Member ports to plug onto a replacement amphora.
  MemberPorts,
  /// Failover network details for the replacement amphora.
  AmpsData,
  /// Network configuration of a load balancer's amphorae.
  NetworkConfig,
  /// Listeners of a load balancer.
  Listeners,
  /// Virtual IP of a load balancer.
  Vip,
}

impl FlowKey {
  /// Stable snake_case name used in logs and error messages.
  pub fn as_str(&self) -> &'static str {
    match self {
      FlowKey::AmphoraId => "amphora_id",
      FlowKey::SpareAmphoraId => "spare_amphora_id",
      FlowKey::ComputeId => "compute_id",
      FlowKey::ComputeInstance => "compute_obj",
      FlowKey::ServerPem => "server_pem",
      FlowKey::Amphora => "amphora",
      FlowKey::FailoverAmphora => "failover_amphora",
      FlowKey::LoadbalancerId => "loadbalancer_id",
      FlowKey::Loadbalancer => "loadbalancer",
      FlowKey::Ports => "ports",
      FlowKey::MemberPorts => "member_ports",
      FlowKey::AmpsData => "amps_data",
      FlowKey::NetworkConfig => "amphorae_network_config",
      FlowKey::Listeners => "listeners",
      FlowKey::Vip => "vip",
    }
  }
}

impl fmt::Display for FlowKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
