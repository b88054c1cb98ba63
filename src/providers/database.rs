//! Database collaborator: amphora and load balancer records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ProviderResult;
use crate::types::{Amphora, AmphoraNetworkDetail, ComputeInstance, Loadbalancer, Port, Role};

/// Record store for amphorae and load balancers.
///
/// Row-level serialization of concurrent flows (two failovers touching the
/// same record) is this collaborator's problem, not the flows'.
#[async_trait]
pub trait AmphoraRepository: Send + Sync {
  /// Inserts a new amphora row and returns its id.
  async fn create_amphora(&self) -> ProviderResult<Uuid>;

  /// Reads the authoritative amphora record.
  async fn reload_amphora(&self, amphora_id: Uuid) -> ProviderResult<Amphora>;

  /// Maps a spare amphora to the load balancer, returning its id, or `None`
  /// when no spare exists.
  async fn find_spare_amphora(&self, loadbalancer_id: Uuid) -> ProviderResult<Option<Uuid>>;

  /// Copies management-network details from the compute record onto the row.
  async fn refresh_from_compute(
    &self,
    amphora_id: Uuid,
    compute: &ComputeInstance,
  ) -> ProviderResult<()>;

  async fn record_compute_id(&self, amphora_id: Uuid, compute_id: Uuid) -> ProviderResult<()>;

  async fn associate_with_loadbalancer(
    &self,
    amphora_id: Uuid,
    loadbalancer_id: Uuid,
  ) -> ProviderResult<()>;

  async fn mark_booting(&self, amphora_id: Uuid, compute_id: Uuid) -> ProviderResult<()>;

  async fn mark_ready(&self, amphora_id: Uuid) -> ProviderResult<()>;

  async fn mark_allocated(&self, amphora_id: Uuid, loadbalancer_id: Uuid) -> ProviderResult<()>;

  async fn mark_pending_delete(&self, amphora_id: Uuid) -> ProviderResult<()>;

  async fn mark_deleted(&self, amphora_id: Uuid) -> ProviderResult<()>;

  /// Flips the row into its error state; used by unit reversion only.
  async fn mark_error(&self, amphora_id: Uuid) -> ProviderResult<()>;

  async fn mark_role(&self, amphora_id: Uuid, role: Role) -> ProviderResult<()>;

  /// Suppresses health-driven actions while a delete is in progress.
  async fn mark_health_busy(&self, amphora_id: Uuid) -> ProviderResult<()>;

  async fn disable_health_monitoring(&self, amphora_id: Uuid) -> ProviderResult<()>;

  async fn update_cert_expiration(
    &self,
    amphora_id: Uuid,
    expires_at: DateTime<Utc>,
  ) -> ProviderResult<()>;

  async fn set_cert_busy(&self, amphora_id: Uuid, busy: bool) -> ProviderResult<()>;

  /// Computes the replacement amphora's network details during failover,
  /// from the ports captured off the failed amphora.
  async fn failover_network_details(
    &self,
    replacement_id: Uuid,
    ports: &[Port],
  ) -> ProviderResult<Vec<AmphoraNetworkDetail>>;

  /// Writes failover VIP data back onto the amphora rows.
  async fn apply_vip_data(&self, amps_data: &[AmphoraNetworkDetail]) -> ProviderResult<()>;

  async fn reload_loadbalancer(&self, loadbalancer_id: Uuid) -> ProviderResult<Loadbalancer>;
}
