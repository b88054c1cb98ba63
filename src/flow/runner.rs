//! Flow executor: walks the tree, threads the store, reverts on failure.
//!
//! One logical thread drives one flow instance; branches of a decision point
//! never run concurrently and there is no intra-flow fan-out. The only
//! suspension points are the pauses between retry attempts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use super::graph::{Decider, GraphFlow};
use super::node::{FlowNode, UnitNode};
use super::retry::RetryFlow;
use super::sequence::Sequence;
use super::store::DataStore;
use super::unit::{Outputs, TaskInputs, WorkUnit};
use crate::error::FlowError;
use crate::types::{FlowKey, FlowValue};

/// Runs a validated tree to completion on one store.
pub(crate) async fn run(root: &FlowNode, store: &mut DataStore) -> Result<(), FlowError> {
  let mut journal = Journal::default();
  run_node(root, store, &mut journal).await
}

/// Record of one completed unit, kept so composites can revert in reverse
/// completion order with the exact inputs and outputs the unit saw.
struct CompletedUnit {
  unit: Arc<dyn WorkUnit>,
  name: String,
  inputs: TaskInputs,
  outputs: Outputs,
}

/// Completion log for one flow execution. Reverted entries are truncated so
/// nothing reverts twice while a failure propagates outward.
#[derive(Default)]
struct Journal {
  completed: Vec<CompletedUnit>,
}

impl Journal {
  fn mark(&self) -> usize {
    self.completed.len()
  }

  /// Best-effort reversion of everything completed since `mark`, newest
  /// first. Revert failures are logged and swallowed so they cannot mask the
  /// error that triggered the reversion.
  async fn revert_to(&mut self, mark: usize) {
    while self.completed.len() > mark {
      let Some(done) = self.completed.pop() else {
        break;
      };
      debug!(unit = %done.name, "reverting work unit");
      if let Err(e) = done.unit.revert(&done.inputs, Some(&done.outputs)).await {
        warn!(unit = %done.name, error = %e, "revert failed, continuing");
      }
    }
  }
}

fn run_node<'a>(
  node: &'a FlowNode,
  store: &'a mut DataStore,
  journal: &'a mut Journal,
) -> BoxFuture<'a, Result<(), FlowError>> {
  async move {
    match node {
      FlowNode::Unit(u) => run_unit(u, store, journal).await,
      FlowNode::Sequence(s) => run_sequence(s, store, journal).await,
      FlowNode::Graph(g) => run_graph(g, store, journal).await,
      FlowNode::Retry(r) => run_retry(r, store, journal).await,
    }
  }
  .boxed()
}

async fn run_unit(
  placed: &UnitNode,
  store: &mut DataStore,
  journal: &mut Journal,
) -> Result<(), FlowError> {
  let mut values = HashMap::new();
  for natural in placed.unit.requires() {
    let store_key = placed.rebind.get(natural).copied().unwrap_or(*natural);
    let value = store.get(store_key).ok_or_else(|| {
      FlowError::definition(format!(
        "unit `{}` requires `{store_key}`, which is not in the store",
        placed.name()
      ))
    })?;
    values.insert(*natural, value.clone());
  }
  let inputs = TaskInputs::new(values);

  debug!(unit = %placed.name(), "executing work unit");
  let outputs = placed
    .unit
    .execute(&inputs)
    .await
    .map_err(|e| FlowError::execution(placed.name(), e))?;

  let declared: HashSet<FlowKey> = placed.unit.provides().iter().copied().collect();
  let produced: HashSet<FlowKey> = outputs.iter().map(|(k, _)| *k).collect();
  if declared != produced {
    return Err(FlowError::definition(format!(
      "unit `{}` produced keys other than its declared provides",
      placed.name()
    )));
  }
  for (natural, value) in &outputs {
    let store_key = placed.provides_as.get(natural).copied().unwrap_or(*natural);
    store.insert(store_key, value.clone())?;
  }

  journal.completed.push(CompletedUnit {
    unit: Arc::clone(&placed.unit),
    name: placed.name().to_string(),
    inputs,
    outputs,
  });
  Ok(())
}

async fn run_sequence(
  seq: &Sequence,
  store: &mut DataStore,
  journal: &mut Journal,
) -> Result<(), FlowError> {
  let mark = journal.mark();
  for node in seq.nodes() {
    if let Err(e) = run_node(node, store, journal).await {
      debug!(sequence = %seq.name(), node = %node.name(), "sequence aborted, reverting");
      journal.revert_to(mark).await;
      return Err(e);
    }
  }
  Ok(())
}

async fn run_graph(
  graph: &GraphFlow,
  store: &mut DataStore,
  journal: &mut Journal,
) -> Result<(), FlowError> {
  let index = graph.node_index();
  let order = graph.topo_order()?;
  let mark = journal.mark();

  let mut done: HashSet<usize> = HashSet::new();
  // Guarded edges that fired, as (from, to) index pairs.
  let mut fired: HashSet<(usize, usize)> = HashSet::new();

  for v in order {
    let node = &graph.nodes()[v];
    let runnable = {
      let mut incoming = graph.incoming(node.name()).peekable();
      if incoming.peek().is_none() {
        true
      } else {
        incoming.any(|e| {
          let p = index[e.from.as_str()];
          done.contains(&p) && (e.decider.is_none() || fired.contains(&(p, v)))
        })
      }
    };
    if !runnable {
      debug!(graph = %graph.name(), node = %node.name(), "branch not taken, skipping");
      continue;
    }

    if let Err(e) = run_node(node, store, journal).await {
      journal.revert_to(mark).await;
      return Err(e);
    }
    done.insert(v);

    let guarded: Vec<(usize, &Decider)> = graph
      .outgoing(node.name())
      .filter_map(|e| e.decider.as_ref().map(|d| (index[e.to.as_str()], d)))
      .collect();
    if guarded.is_empty() {
      continue;
    }
    let result = decision_result(node, store)?;
    let mut fired_here = 0;
    for (target, decider) in guarded {
      let fires = decider.decide(&result);
      debug!(
        graph = %graph.name(),
        decider = %decider.name(),
        fires,
        "evaluated decider"
      );
      if fires {
        fired_here += 1;
        fired.insert((v, target));
      }
    }
    if fired_here > 1 {
      journal.revert_to(mark).await;
      return Err(FlowError::definition(format!(
        "deciders on `{}` in graph `{}` are not mutually exclusive",
        node.name(),
        graph.name()
      )));
    }
    if fired_here == 0 {
      info!(
        graph = %graph.name(),
        decision = %node.name(),
        "no decider fired, guarded branches skipped"
      );
    }
  }
  Ok(())
}

/// The produced result a decision point's deciders inspect: the value of its
/// single provided key, read back from the store right after it completed.
fn decision_result(node: &FlowNode, store: &DataStore) -> Result<FlowValue, FlowError> {
  let FlowNode::Unit(u) = node else {
    return Err(FlowError::definition(format!(
      "decision point `{}` is not a work unit",
      node.name()
    )));
  };
  let keys = u.store_provides();
  let [key] = keys.as_slice() else {
    return Err(FlowError::definition(format!(
      "decision point `{}` must provide exactly one key",
      u.name()
    )));
  };
  store
    .get(*key)
    .cloned()
    .ok_or_else(|| FlowError::definition(format!("decision key `{key}` missing from store")))
}

async fn run_retry(
  retry: &RetryFlow,
  store: &mut DataStore,
  journal: &mut Journal,
) -> Result<(), FlowError> {
  let max = retry.max_attempts();
  let mut attempt = 0u32;
  loop {
    attempt += 1;
    let keys_before = store.keys();
    match run_sequence(retry.body(), store, journal).await {
      Ok(()) => {
        if attempt > 1 {
          info!(flow = %retry.name(), attempt, "retry flow succeeded");
        }
        return Ok(());
      }
      // A nested exhaustion is terminal; it must not consume this budget.
      Err(e) if e.is_retry_exhausted() => return Err(e),
      Err(e) => {
        store.discard_except(&keys_before);
        if attempt >= max {
          warn!(flow = %retry.name(), attempts = max, "retry budget exhausted");
          return Err(FlowError::RetryExhausted {
            flow: retry.name().to_string(),
            attempts: max,
            source: Box::new(e),
          });
        }
        debug!(flow = %retry.name(), attempt, error = %e, "attempt failed, retrying");
        if !retry.interval().is_zero() {
          tokio::time::sleep(retry.interval()).await;
        }
      }
    }
  }
}
