//! Domain records and the symbolic key/value pairs threaded through flows.
//!
//! Every value a work unit produces or consumes is one [`FlowValue`] stored
//! under one [`FlowKey`]; the remaining types are the records those values
//! carry.

mod amp_network_detail;
mod amphora;
mod cert_bundle;
mod compute_instance;
mod flow_key;
mod flow_value;
#[cfg(test)]
mod flow_value_test;
mod listener;
mod loadbalancer;
mod network_config;
mod port;
mod role;
mod vip;

pub use amp_network_detail::AmphoraNetworkDetail;
pub use amphora::{Amphora, AmphoraStatus};
pub use cert_bundle::CertBundle;
pub use compute_instance::{ComputeInstance, ComputeStatus};
pub use flow_key::FlowKey;
pub use flow_value::FlowValue;
pub use listener::Listener;
pub use loadbalancer::Loadbalancer;
pub use network_config::{AmphoraAttachment, NetworkConfig};
pub use port::Port;
pub use role::Role;
pub use vip::Vip;
