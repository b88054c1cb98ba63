//! Tagged value passed between work units through the data store.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
  Amphora, AmphoraNetworkDetail, CertBundle, ComputeInstance, Listener, Loadbalancer,
  NetworkConfig, Port, Vip,
};

/// A value a work unit provides into the [`DataStore`](crate::flow::DataStore).
///
/// `Absent` is an explicit null: the spare-amphora lookup provides it when no
/// spare exists, and deciders branch on it. Absence is data, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FlowValue {
  Absent,
  AmphoraId(Uuid),
  ComputeId(Uuid),
  LoadbalancerId(Uuid),
  ServerPem(CertBundle),
  Compute(ComputeInstance),
  Amphora(Amphora),
  Loadbalancer(Loadbalancer),
  Ports(Vec<Port>),
  AmpsData(Vec<AmphoraNetworkDetail>),
  NetworkConfig(NetworkConfig),
  Listeners(Vec<Listener>),
  Vip(Vip),
}

impl FlowValue {
  /// True for every variant except [`FlowValue::Absent`].
  pub fn is_present(&self) -> bool {
    !matches!(self, FlowValue::Absent)
  }

  /// Short variant name for logs and error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      FlowValue::Absent => "absent",
      FlowValue::AmphoraId(_) => "amphora_id",
      FlowValue::ComputeId(_) => "compute_id",
      FlowValue::LoadbalancerId(_) => "loadbalancer_id",
      FlowValue::ServerPem(_) => "server_pem",
      FlowValue::Compute(_) => "compute",
      FlowValue::Amphora(_) => "amphora",
      FlowValue::Loadbalancer(_) => "loadbalancer",
      FlowValue::Ports(_) => "ports",
      FlowValue::AmpsData(_) => "amps_data",
      FlowValue::NetworkConfig(_) => "network_config",
      FlowValue::Listeners(_) => "listeners",
      FlowValue::Vip(_) => "vip",
    }
  }

  pub fn as_amphora_id(&self) -> Option<Uuid> {
    match self {
      FlowValue::AmphoraId(id) => Some(*id),
      _ => None,
    }
  }

  pub fn as_compute_id(&self) -> Option<Uuid> {
    match self {
      FlowValue::ComputeId(id) => Some(*id),
      _ => None,
    }
  }

  pub fn as_loadbalancer_id(&self) -> Option<Uuid> {
    match self {
      FlowValue::LoadbalancerId(id) => Some(*id),
      _ => None,
    }
  }

  pub fn as_server_pem(&self) -> Option<&CertBundle> {
    match self {
      FlowValue::ServerPem(b) => Some(b),
      _ => None,
    }
  }

  pub fn as_compute(&self) -> Option<&ComputeInstance> {
    match self {
      FlowValue::Compute(c) => Some(c),
      _ => None,
    }
  }

  pub fn as_amphora(&self) -> Option<&Amphora> {
    match self {
      FlowValue::Amphora(a) => Some(a),
      _ => None,
    }
  }

  pub fn as_loadbalancer(&self) -> Option<&Loadbalancer> {
    match self {
      FlowValue::Loadbalancer(lb) => Some(lb),
      _ => None,
    }
  }

  pub fn as_ports(&self) -> Option<&[Port]> {
    match self {
      FlowValue::Ports(p) => Some(p),
      _ => None,
    }
  }

  pub fn as_amps_data(&self) -> Option<&[AmphoraNetworkDetail]> {
    match self {
      FlowValue::AmpsData(d) => Some(d),
      _ => None,
    }
  }

  pub fn as_network_config(&self) -> Option<&NetworkConfig> {
    match self {
      FlowValue::NetworkConfig(c) => Some(c),
      _ => None,
    }
  }

  pub fn as_listeners(&self) -> Option<&[Listener]> {
    match self {
      FlowValue::Listeners(l) => Some(l),
      _ => None,
    }
  }

  pub fn as_vip(&self) -> Option<&Vip> {
    match self {
      FlowValue::Vip(v) => Some(v),
      _ => None,
    }
  }
}

impl fmt::Display for FlowValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.kind())
  }
}
