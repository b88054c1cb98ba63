//! Scripted work unit shared by the flow engine tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::unit::{Outputs, TaskInputs, WorkUnit};
use crate::providers::{ProviderError, ProviderResult};
use crate::types::{FlowKey, FlowValue};

/// Shared call log; entries look like `exec:<name>` and `revert:<name>`.
pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn call_log() -> CallLog {
  Arc::new(Mutex::new(Vec::new()))
}

pub(crate) fn entries(log: &CallLog) -> Vec<String> {
  log.lock().expect("log lock").clone()
}

/// Work unit whose behavior is scripted by the test: declared keys, fixed
/// outputs, and failure injection for execute and revert.
pub(crate) struct ScriptedUnit {
  name: String,
  requires: Vec<FlowKey>,
  provides: Vec<FlowKey>,
  outputs: Vec<(FlowKey, FlowValue)>,
  fail_first: Mutex<u32>,
  fail_always: bool,
  fail_revert: bool,
  log: CallLog,
}

impl ScriptedUnit {
  pub fn new(name: &str, log: &CallLog) -> Self {
    ScriptedUnit {
      name: name.to_string(),
      requires: Vec::new(),
      provides: Vec::new(),
      outputs: Vec::new(),
      fail_first: Mutex::new(0),
      fail_always: false,
      fail_revert: false,
      log: Arc::clone(log),
    }
  }

  pub fn needs(mut self, keys: &[FlowKey]) -> Self {
    self.requires.extend_from_slice(keys);
    self
  }

  pub fn gives(mut self, key: FlowKey, value: FlowValue) -> Self {
    self.provides.push(key);
    self.outputs.push((key, value));
    self
  }

  pub fn failing(mut self) -> Self {
    self.fail_always = true;
    self
  }

  /// Fails the first `n` executions, then succeeds.
  pub fn failing_first(self, n: u32) -> Self {
    *self.fail_first.lock().expect("fail_first lock") = n;
    self
  }

  pub fn failing_revert(mut self) -> Self {
    self.fail_revert = true;
    self
  }
}

#[async_trait]
impl WorkUnit for ScriptedUnit {
  fn name(&self) -> &str {
    &self.name
  }

  fn requires(&self) -> &[FlowKey] {
    &self.requires
  }

  fn provides(&self) -> &[FlowKey] {
    &self.provides
  }

  async fn execute(&self, _inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .log
      .lock()
      .expect("log lock")
      .push(format!("exec:{}", self.name));
    if self.fail_always {
      return Err(ProviderError::new(format!("{} failed", self.name)));
    }
    {
      let mut remaining = self.fail_first.lock().expect("fail_first lock");
      if *remaining > 0 {
        *remaining -= 1;
        return Err(ProviderError::new(format!("{} not ready", self.name)));
      }
    }
    Ok(self.outputs.clone())
  }

  async fn revert(&self, _inputs: &TaskInputs, _outputs: Option<&Outputs>) -> ProviderResult<()> {
    self
      .log
      .lock()
      .expect("log lock")
      .push(format!("revert:{}", self.name));
    if self.fail_revert {
      return Err(ProviderError::new(format!("{} revert failed", self.name)));
    }
    Ok(())
  }
}
