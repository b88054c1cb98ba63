//! # amphora-flows
//!
//! Lifecycle workflows for amphorae, the managed virtual appliances that run
//! a load balancer's data plane, expressed as statically validated trees of
//! async work units.
//!
//! ## Architecture
//!
//! The `flow` module is the composition model: named work units with declared
//! data dependencies, wired into sequences, graphs with decider-guarded edges,
//! and bounded-retry subflows. Units delegate to the collaborator traits in
//! `providers` (database, compute, certificates, network, appliance control);
//! the `tasks` module holds one unit per collaborator operation, and
//! [`flows::AmphoraFlows`] assembles them into the create / get-for-LB /
//! delete / failover / certificate-rotation workflows.
//!
//! One executor drives one flow instance per lifecycle event against its own
//! [`flow::DataStore`]; nothing is shared across events.

pub mod config;
pub mod error;
pub mod flow;
pub mod flows;
pub mod providers;
pub mod tasks;
#[cfg(test)]
mod testing;
pub mod types;

pub use config::{DriverMode, FlowConfig};
pub use error::FlowError;
pub use flow::{
  DataStore, Decider, Flow, FlowNode, GraphFlow, Outputs, RetryFlow, Sequence, TaskInputs,
  UnitNode, WorkUnit,
};
pub use flows::AmphoraFlows;
pub use providers::{ProviderError, Providers};
pub use types::{FlowKey, FlowValue};
