//! Collaborator contracts the lifecycle flows delegate to.
//!
//! The core owns no database, compute, certificate, network, or appliance
//! logic; each work unit calls exactly one of these traits. Implementations
//! decide what is transient and what is fatal; the flows only propagate.

use std::sync::Arc;

use thiserror::Error;

mod appliance;
mod certs;
mod compute;
mod database;
mod network;

pub use appliance::ApplianceDriver;
pub use certs::CertificateAuthority;
pub use compute::ComputeProvider;
pub use database::AmphoraRepository;
pub use network::NetworkProvider;

/// Opaque failure reported by a collaborator.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
  message: String,
}

impl ProviderError {
  pub fn new(message: impl Into<String>) -> Self {
    ProviderError {
      message: message.into(),
    }
  }
}

/// Result alias used by every collaborator operation.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Bundle of collaborators handed to the flow factory.
#[derive(Clone)]
pub struct Providers {
  pub database: Arc<dyn AmphoraRepository>,
  pub compute: Arc<dyn ComputeProvider>,
  pub certs: Arc<dyn CertificateAuthority>,
  pub network: Arc<dyn NetworkProvider>,
  pub appliance: Arc<dyn ApplianceDriver>,
}
