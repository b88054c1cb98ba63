//! Per-execution data store shared by a flow's work units.

use std::collections::{HashMap, HashSet};

use crate::error::FlowError;
use crate::types::{FlowKey, FlowValue};

/// Write-once key/value context for a single flow execution.
///
/// A store lives exactly as long as one lifecycle event: it is seeded with
/// the flow's initial keys, filled in by unit outputs, and discarded when the
/// executor returns. Each key may be written once per execution; retry
/// attempts discard their partial writes before re-running.
#[derive(Debug, Default)]
pub struct DataStore {
  values: HashMap<FlowKey, FlowValue>,
}

impl DataStore {
  pub fn new() -> Self {
    DataStore::default()
  }

  /// Builds a store pre-populated with the flow's initial values.
  pub fn seeded(values: impl IntoIterator<Item = (FlowKey, FlowValue)>) -> Self {
    DataStore {
      values: values.into_iter().collect(),
    }
  }

  /// Writes a value under `key`. Writing a key twice in one execution is a
  /// definition-level fault: provenance is validated at build time, so a
  /// duplicate here means the flow lied about its `provides`.
  pub fn insert(&mut self, key: FlowKey, value: FlowValue) -> Result<(), FlowError> {
    if self.values.contains_key(&key) {
      return Err(FlowError::definition(format!(
        "key `{key}` written twice in one execution"
      )));
    }
    self.values.insert(key, value);
    Ok(())
  }

  pub fn get(&self, key: FlowKey) -> Option<&FlowValue> {
    self.values.get(&key)
  }

  pub fn contains(&self, key: FlowKey) -> bool {
    self.values.contains_key(&key)
  }

  /// Snapshot of the keys currently present, for retry rollback.
  pub fn keys(&self) -> HashSet<FlowKey> {
    self.values.keys().copied().collect()
  }

  /// Drops every key not in `keep`. Used by retry subflows to discard the
  /// partial results of a failed attempt.
  pub fn discard_except(&mut self, keep: &HashSet<FlowKey>) {
    self.values.retain(|k, _| keep.contains(k));
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}
