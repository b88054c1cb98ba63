//! Server certificate bundle issued by the certificate authority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key/certificate pair for an amphora's controller-facing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertBundle {
  /// Concatenated PEM (private key + certificate chain).
  pub pem: String,
  pub expires_at: DateTime<Utc>,
}
