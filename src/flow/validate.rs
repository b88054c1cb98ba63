//! Construction-time validation of a flow tree.
//!
//! Everything here runs before a flow can execute: malformed definitions
//! (unknown edge targets, cycles, ambiguous key provenance, unsatisfied
//! requires) are rejected as [`FlowError::Definition`] and never reach a
//! collaborator.

use std::collections::{HashMap, HashSet};

use super::graph::GraphFlow;
use super::node::{FlowNode, UnitNode};
use super::sequence::Sequence;
use crate::error::FlowError;
use crate::types::FlowKey;

/// Validates the whole tree against the keys the caller seeds the store with.
pub(crate) fn validate_flow(
  root: &FlowNode,
  initial: &HashSet<FlowKey>,
) -> Result<(), FlowError> {
  validate_node(root, initial).map(|_| ())
}

/// Validates one node; returns the key set available after it completes.
fn validate_node(
  node: &FlowNode,
  available: &HashSet<FlowKey>,
) -> Result<HashSet<FlowKey>, FlowError> {
  match node {
    FlowNode::Unit(u) => validate_unit(u, available),
    FlowNode::Sequence(s) => validate_sequence(s, available),
    FlowNode::Graph(g) => validate_graph(g, available),
    FlowNode::Retry(r) => {
      if r.max_attempts() == 0 {
        return Err(FlowError::definition(format!(
          "retry flow `{}` needs a positive attempt budget",
          r.name()
        )));
      }
      validate_sequence(r.body(), available)
    }
  }
}

fn validate_unit(
  unit: &UnitNode,
  available: &HashSet<FlowKey>,
) -> Result<HashSet<FlowKey>, FlowError> {
  for natural in unit.rebind.keys() {
    if !unit.unit.requires().contains(natural) {
      return Err(FlowError::definition(format!(
        "unit `{}` rebinds `{natural}`, which it does not require",
        unit.name()
      )));
    }
  }
  for natural in unit.provides_as.keys() {
    if !unit.unit.provides().contains(natural) {
      return Err(FlowError::definition(format!(
        "unit `{}` re-keys `{natural}`, which it does not provide",
        unit.name()
      )));
    }
  }
  for key in unit.store_requires() {
    if !available.contains(&key) {
      return Err(FlowError::definition(format!(
        "unit `{}` requires `{key}`, which nothing upstream provides",
        unit.name()
      )));
    }
  }
  let mut after = available.clone();
  for key in unit.store_provides() {
    if !after.insert(key) {
      return Err(FlowError::definition(format!(
        "key `{key}` already has a provider upstream of unit `{}`",
        unit.name()
      )));
    }
  }
  Ok(after)
}

fn validate_sequence(
  seq: &Sequence,
  available: &HashSet<FlowKey>,
) -> Result<HashSet<FlowKey>, FlowError> {
  check_unique_names(seq.name(), seq.nodes())?;
  let mut avail = available.clone();
  for node in seq.nodes() {
    avail = validate_node(node, &avail)?;
  }
  Ok(avail)
}

fn validate_graph(
  graph: &GraphFlow,
  available: &HashSet<FlowKey>,
) -> Result<HashSet<FlowKey>, FlowError> {
  check_unique_names(graph.name(), graph.nodes())?;

  let index = graph.node_index();
  for edge in graph.edges() {
    for end in [edge.from.as_str(), edge.to.as_str()] {
      if !index.contains_key(end) {
        return Err(FlowError::definition(format!(
          "graph `{}` links unknown node `{end}`",
          graph.name()
        )));
      }
    }
    if edge.from == edge.to {
      return Err(FlowError::definition(format!(
        "graph `{}` links `{}` to itself",
        graph.name(),
        edge.from
      )));
    }
  }

  let order = graph.topo_order()?;

  // A decision point must be a single-provide unit so its deciders have an
  // unambiguous result to inspect.
  for node in graph.nodes() {
    if graph.outgoing(node.name()).any(|e| e.decider.is_some()) {
      match node {
        FlowNode::Unit(u) if u.store_provides().len() == 1 => {}
        _ => {
          return Err(FlowError::definition(format!(
            "decision point `{}` in graph `{}` must be a unit providing exactly one key",
            node.name(),
            graph.name()
          )));
        }
      }
    }
  }

  let n = graph.nodes().len();
  let provides: Vec<HashSet<FlowKey>> = graph.nodes().iter().map(node_provides).collect();

  // Transitive ancestor sets, in topological order.
  let mut ancestors: Vec<HashSet<usize>> = vec![HashSet::new(); n];
  for &v in &order {
    let name = graph.nodes()[v].name().to_string();
    let preds: Vec<usize> = graph.incoming(&name).map(|e| index[e.from.as_str()]).collect();
    for p in preds {
      let pred_anc: Vec<usize> = ancestors[p].iter().copied().collect();
      ancestors[v].insert(p);
      ancestors[v].extend(pred_anc);
    }
  }

  // Per-node dataflow: a node sees the graph entry keys plus everything its
  // ancestors provide.
  for &v in &order {
    let mut avail = available.clone();
    for &a in &ancestors[v] {
      avail.extend(provides[a].iter().copied());
    }
    validate_node(&graph.nodes()[v], &avail)?;
  }

  // Descendant sets (inclusive), for exclusivity reasoning.
  let mut reach: Vec<HashSet<usize>> = vec![HashSet::new(); n];
  for &v in order.iter().rev() {
    reach[v].insert(v);
    let name = graph.nodes()[v].name().to_string();
    let succs: Vec<usize> = graph.outgoing(&name).map(|e| index[e.to.as_str()]).collect();
    for s in succs {
      let succ_reach: Vec<usize> = reach[s].iter().copied().collect();
      reach[v].extend(succ_reach);
    }
  }

  // Two nodes may provide the same key only if they can never both execute:
  // they must hang off distinct guarded branches of one decision point.
  for u in 0..n {
    for v in (u + 1)..n {
      if ancestors[u].contains(&v) || ancestors[v].contains(&u) {
        continue;
      }
      let shared: Vec<FlowKey> = provides[u].intersection(&provides[v]).copied().collect();
      if shared.is_empty() {
        continue;
      }
      if !mutually_exclusive(graph, &index, &reach, u, v) {
        return Err(FlowError::definition(format!(
          "key `{}` provided by both `{}` and `{}`, which are not mutually exclusive",
          shared[0],
          graph.nodes()[u].name(),
          graph.nodes()[v].name()
        )));
      }
    }
  }

  // Keys guaranteed after the graph: unconditional nodes always run, and a
  // decision point contributes what every one of its branches provides.
  let mut after = available.clone();
  for u in unconditional_nodes(graph, &index) {
    after.extend(provides[u].iter().copied());
  }
  for node in graph.nodes() {
    let guarded: Vec<usize> = graph
      .outgoing(node.name())
      .filter(|e| e.decider.is_some())
      .map(|e| index[e.to.as_str()])
      .collect();
    if guarded.len() < 2 {
      continue;
    }
    let mut common: Option<HashSet<FlowKey>> = None;
    for b in guarded {
      let mut branch_keys = HashSet::new();
      for &d in &reach[b] {
        branch_keys.extend(provides[d].iter().copied());
      }
      common = Some(match common {
        None => branch_keys,
        Some(c) => c.intersection(&branch_keys).copied().collect(),
      });
    }
    if let Some(c) = common {
      after.extend(c);
    }
  }
  Ok(after)
}

fn check_unique_names(parent: &str, nodes: &[FlowNode]) -> Result<(), FlowError> {
  let mut seen = HashSet::new();
  for node in nodes {
    if !seen.insert(node.name()) {
      return Err(FlowError::definition(format!(
        "`{parent}` contains two nodes named `{}`",
        node.name()
      )));
    }
  }
  Ok(())
}

/// Union of the store keys a node (recursively) provides.
fn node_provides(node: &FlowNode) -> HashSet<FlowKey> {
  match node {
    FlowNode::Unit(u) => u.store_provides().into_iter().collect(),
    FlowNode::Sequence(s) => s.nodes().iter().flat_map(node_provides).collect(),
    FlowNode::Graph(g) => g.nodes().iter().flat_map(node_provides).collect(),
    FlowNode::Retry(r) => r.body().nodes().iter().flat_map(node_provides).collect(),
  }
}

/// True when `u` and `v` hang off distinct guarded branches of one decision
/// point, so at most one of them executes.
fn mutually_exclusive(
  graph: &GraphFlow,
  index: &HashMap<&str, usize>,
  reach: &[HashSet<usize>],
  u: usize,
  v: usize,
) -> bool {
  for node in graph.nodes() {
    let guarded: Vec<usize> = graph
      .outgoing(node.name())
      .filter(|e| e.decider.is_some())
      .map(|e| index[e.to.as_str()])
      .collect();
    if guarded.len() < 2 {
      continue;
    }
    for &a in &guarded {
      for &b in &guarded {
        if a == b {
          continue;
        }
        if reach[a].contains(&u) && !reach[b].contains(&u) && reach[b].contains(&v)
          && !reach[a].contains(&v)
        {
          return true;
        }
      }
    }
  }
  false
}

/// Nodes reachable from a root without crossing a guarded edge; they run on
/// every execution of the graph.
fn unconditional_nodes(graph: &GraphFlow, index: &HashMap<&str, usize>) -> Vec<usize> {
  let n = graph.nodes().len();
  let roots: Vec<usize> = (0..n)
    .filter(|&i| graph.incoming(graph.nodes()[i].name()).next().is_none())
    .collect();
  let mut seen: HashSet<usize> = roots.iter().copied().collect();
  let mut queue: Vec<usize> = roots;
  while let Some(v) = queue.pop() {
    let name = graph.nodes()[v].name().to_string();
    for edge in graph.outgoing(&name) {
      if edge.decider.is_some() {
        continue;
      }
      let t = index[edge.to.as_str()];
      if seen.insert(t) {
        queue.push(t);
      }
    }
  }
  seen.into_iter().collect()
}
