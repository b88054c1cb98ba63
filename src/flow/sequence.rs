//! Ordered, fail-fast, reversible composition of flow nodes.

use super::node::FlowNode;

/// Ordered list of nodes, executed front to back.
///
/// The first failure aborts the sequence; units that already completed are
/// reverted in strict reverse order before the failure propagates.
pub struct Sequence {
  name: String,
  nodes: Vec<FlowNode>,
}

impl Sequence {
  pub fn new(name: impl Into<String>) -> Self {
    Sequence {
      name: name.into(),
      nodes: Vec::new(),
    }
  }

  /// Appends a node, builder style.
  pub fn with(mut self, node: impl Into<FlowNode>) -> Self {
    self.nodes.push(node.into());
    self
  }

  pub fn add(&mut self, node: impl Into<FlowNode>) {
    self.nodes.push(node.into());
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn nodes(&self) -> &[FlowNode] {
    &self.nodes
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}
