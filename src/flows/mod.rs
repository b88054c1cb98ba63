//! Lifecycle flow factories.

mod amphora_flows;

pub use amphora_flows::AmphoraFlows;
