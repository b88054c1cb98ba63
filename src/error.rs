//! Error taxonomy for flow construction and execution.

use thiserror::Error;

use crate::providers::ProviderError;

/// Failure of a flow, split by where the fault lies.
///
/// `Definition` errors surface while a flow is being built and never reach
/// execution. `Execution` wraps a collaborator failure without classifying it.
/// `RetryExhausted` is terminal: enclosing flows propagate it unchanged and
/// never retry it themselves.
#[derive(Debug, Error)]
pub enum FlowError {
  /// Malformed flow definition, rejected at build time.
  #[error("invalid flow definition: {0}")]
  Definition(String),

  /// A work unit's delegated operation failed.
  #[error("work unit `{unit}` failed: {source}")]
  Execution {
    unit: String,
    #[source]
    source: ProviderError,
  },

  /// A retry subflow ran out of attempts.
  #[error("`{flow}` exhausted its retry budget after {attempts} attempts: {source}")]
  RetryExhausted {
    flow: String,
    attempts: u32,
    #[source]
    source: Box<FlowError>,
  },
}

impl FlowError {
  pub fn definition(msg: impl Into<String>) -> Self {
    FlowError::Definition(msg.into())
  }

  pub(crate) fn execution(unit: impl Into<String>, source: ProviderError) -> Self {
    FlowError::Execution {
      unit: unit.into(),
      source,
    }
  }

  /// True when the error is (or wraps nothing but) an exhausted retry budget.
  pub fn is_retry_exhausted(&self) -> bool {
    matches!(self, FlowError::RetryExhausted { .. })
  }
}
