//! Flow tree: placed work units and their composites.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;

use super::graph::GraphFlow;
use super::retry::RetryFlow;
use super::runner;
use super::sequence::Sequence;
use super::store::DataStore;
use super::unit::WorkUnit;
use super::validate;
use crate::error::FlowError;
use crate::types::FlowKey;

/// One node of a flow tree. Leaves are placed work units; composites nest
/// arbitrarily, so a whole sub-flow can sit where a unit would.
pub enum FlowNode {
  Unit(UnitNode),
  Sequence(Sequence),
  Graph(GraphFlow),
  Retry(RetryFlow),
}

impl FlowNode {
  pub fn name(&self) -> &str {
    match self {
      FlowNode::Unit(u) => u.name(),
      FlowNode::Sequence(s) => s.name(),
      FlowNode::Graph(g) => g.name(),
      FlowNode::Retry(r) => r.name(),
    }
  }
}

impl From<UnitNode> for FlowNode {
  fn from(u: UnitNode) -> Self {
    FlowNode::Unit(u)
  }
}

impl From<Sequence> for FlowNode {
  fn from(s: Sequence) -> Self {
    FlowNode::Sequence(s)
  }
}

impl From<GraphFlow> for FlowNode {
  fn from(g: GraphFlow) -> Self {
    FlowNode::Graph(g)
  }
}

impl From<RetryFlow> for FlowNode {
  fn from(r: RetryFlow) -> Self {
    FlowNode::Retry(r)
  }
}

/// A work unit placed into a flow: an instance name plus the key bindings
/// that map the unit's natural `requires`/`provides` onto store keys.
///
/// Rebinding is how two live identities of the same kind stay apart: the
/// failover flow reads the replacement amphora by rebinding the natural
/// `amphora` input to the `failover_amphora` store key.
pub struct UnitNode {
  pub(crate) unit: Arc<dyn WorkUnit>,
  pub(crate) name: String,
  pub(crate) rebind: HashMap<FlowKey, FlowKey>,
  pub(crate) provides_as: HashMap<FlowKey, FlowKey>,
}

impl UnitNode {
  pub fn new(unit: impl WorkUnit + 'static) -> Self {
    let name = unit.name().to_string();
    UnitNode {
      unit: Arc::new(unit),
      name,
      rebind: HashMap::new(),
      provides_as: HashMap::new(),
    }
  }

  /// Overrides the instance name, e.g. to carry a sub-flow prefix.
  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = name.into();
    self
  }

  /// Reads the natural input `natural` from store key `store_key` instead.
  pub fn rebind(mut self, natural: FlowKey, store_key: FlowKey) -> Self {
    self.rebind.insert(natural, store_key);
    self
  }

  /// Writes the natural output `natural` under store key `store_key` instead.
  pub fn provides_as(mut self, natural: FlowKey, store_key: FlowKey) -> Self {
    self.provides_as.insert(natural, store_key);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Store keys this placement reads, after rebinding.
  pub(crate) fn store_requires(&self) -> Vec<FlowKey> {
    self
      .unit
      .requires()
      .iter()
      .map(|k| self.rebind.get(k).copied().unwrap_or(*k))
      .collect()
  }

  /// Store keys this placement writes, after rebinding.
  pub(crate) fn store_provides(&self) -> Vec<FlowKey> {
    self
      .unit
      .provides()
      .iter()
      .map(|k| self.provides_as.get(k).copied().unwrap_or(*k))
      .collect()
  }
}

/// A validated flow, ready to run against a [`DataStore`].
///
/// `build` performs every construction-time check; a `Flow` that exists is
/// structurally sound, so execution failures can only come from
/// collaborators or exhausted retries.
pub struct Flow {
  name: String,
  root: FlowNode,
  initial: HashSet<FlowKey>,
}

impl Flow {
  /// Validates `root` against the keys the caller promises to seed and wraps
  /// it. Fails with [`FlowError::Definition`] on any structural fault.
  pub fn build(
    name: impl Into<String>,
    root: impl Into<FlowNode>,
    initial: &[FlowKey],
  ) -> Result<Self, FlowError> {
    let name = name.into();
    let root = root.into();
    let initial: HashSet<FlowKey> = initial.iter().copied().collect();
    validate::validate_flow(&root, &initial)?;
    Ok(Flow {
      name,
      root,
      initial,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn root(&self) -> &FlowNode {
    &self.root
  }

  /// Unwraps the tree so the flow can be nested inside a larger one.
  pub fn into_node(self) -> FlowNode {
    self.root
  }

  /// Drives the flow to completion on one store.
  pub async fn run(&self, store: &mut DataStore) -> Result<(), FlowError> {
    for key in &self.initial {
      if !store.contains(*key) {
        return Err(FlowError::definition(format!(
          "flow `{}` needs initial key `{key}` in the store",
          self.name
        )));
      }
    }
    info!(flow = %self.name, "running flow");
    let result = runner::run(&self.root, store).await;
    match &result {
      Ok(()) => info!(flow = %self.name, "flow completed"),
      Err(e) => info!(flow = %self.name, error = %e, "flow failed"),
    }
    result
  }
}
