//! Work units that mutate or read amphora and load balancer records.
//!
//! Reverts follow the repository convention: a mutation that advanced an
//! amphora's state is compensated by flipping the row to its error state, so
//! operators can find and reclaim it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::flow::{Outputs, TaskInputs, WorkUnit};
use crate::providers::{AmphoraRepository, ProviderResult};
use crate::types::{FlowKey, FlowValue, Role};

/// Inserts a new amphora row and provides its id.
pub struct CreateAmphoraRecord {
  db: Arc<dyn AmphoraRepository>,
}

impl CreateAmphoraRecord {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    CreateAmphoraRecord { db }
  }
}

#[async_trait]
impl WorkUnit for CreateAmphoraRecord {
  fn name(&self) -> &str {
    "create-amphora-record"
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId]
  }

  async fn execute(&self, _inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let id = self.db.create_amphora().await?;
    debug!(amphora = %id, "created amphora record");
    Ok(vec![(FlowKey::AmphoraId, FlowValue::AmphoraId(id))])
  }

  async fn revert(&self, _inputs: &TaskInputs, outputs: Option<&Outputs>) -> ProviderResult<()> {
    let id = outputs
      .and_then(|o| o.first())
      .and_then(|(_, v)| v.as_amphora_id());
    match id {
      Some(id) => self.db.mark_error(id).await,
      None => Ok(()),
    }
  }
}

/// Reads the authoritative amphora record.
pub struct ReloadAmphora {
  db: Arc<dyn AmphoraRepository>,
}

impl ReloadAmphora {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    ReloadAmphora { db }
  }
}

#[async_trait]
impl WorkUnit for ReloadAmphora {
  fn name(&self) -> &str {
    "reload-amphora"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let amphora = self.db.reload_amphora(inputs.amphora_id()?).await?;
    Ok(vec![(FlowKey::Amphora, FlowValue::Amphora(amphora))])
  }
}

/// Tries to map a spare amphora to the load balancer. Provides the spare's
/// id when one exists, or an explicit absent value (never an error) so the
/// enclosing graph can branch on the outcome.
pub struct MapSpareToLoadbalancer {
  db: Arc<dyn AmphoraRepository>,
}

impl MapSpareToLoadbalancer {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    MapSpareToLoadbalancer { db }
  }
}

#[async_trait]
impl WorkUnit for MapSpareToLoadbalancer {
  fn name(&self) -> &str {
    "map-spare-to-loadbalancer"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::LoadbalancerId]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::SpareAmphoraId]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let lb_id = inputs.loadbalancer_id()?;
    let value = match self.db.find_spare_amphora(lb_id).await? {
      Some(id) => {
        debug!(amphora = %id, loadbalancer = %lb_id, "mapped spare amphora");
        FlowValue::AmphoraId(id)
      }
      None => {
        debug!(loadbalancer = %lb_id, "no spare amphora available");
        FlowValue::Absent
      }
    };
    Ok(vec![(FlowKey::SpareAmphoraId, value)])
  }
}

/// Copies management-network details from the polled compute record onto the
/// amphora row. Provides nothing; the authoritative reload that follows the
/// wait loop is the single provider of the record.
pub struct RefreshAmphoraFromCompute {
  db: Arc<dyn AmphoraRepository>,
}

impl RefreshAmphoraFromCompute {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    RefreshAmphoraFromCompute { db }
  }
}

#[async_trait]
impl WorkUnit for RefreshAmphoraFromCompute {
  fn name(&self) -> &str {
    "refresh-amphora-from-compute"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId, FlowKey::ComputeInstance]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .db
      .refresh_from_compute(inputs.amphora_id()?, inputs.compute()?)
      .await?;
    Ok(vec![])
  }
}

/// Records the compute instance id on the amphora row.
pub struct RecordComputeId {
  db: Arc<dyn AmphoraRepository>,
}

impl RecordComputeId {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    RecordComputeId { db }
  }
}

#[async_trait]
impl WorkUnit for RecordComputeId {
  fn name(&self) -> &str {
    "record-compute-id"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId, FlowKey::ComputeId]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .db
      .record_compute_id(inputs.amphora_id()?, inputs.compute_id()?)
      .await?;
    Ok(vec![])
  }
}

/// Associates a replacement amphora with the failed one's load balancer.
pub struct AssociateWithLoadbalancer {
  db: Arc<dyn AmphoraRepository>,
}

impl AssociateWithLoadbalancer {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    AssociateWithLoadbalancer { db }
  }
}

#[async_trait]
impl WorkUnit for AssociateWithLoadbalancer {
  fn name(&self) -> &str {
    "associate-with-loadbalancer"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId, FlowKey::LoadbalancerId]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .db
      .associate_with_loadbalancer(inputs.amphora_id()?, inputs.loadbalancer_id()?)
      .await?;
    Ok(vec![])
  }
}

/// Marks the amphora booting once compute has been requested.
pub struct MarkAmphoraBooting {
  db: Arc<dyn AmphoraRepository>,
}

impl MarkAmphoraBooting {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    MarkAmphoraBooting { db }
  }
}

#[async_trait]
impl WorkUnit for MarkAmphoraBooting {
  fn name(&self) -> &str {
    "mark-amphora-booting"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId, FlowKey::ComputeId]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .db
      .mark_booting(inputs.amphora_id()?, inputs.compute_id()?)
      .await?;
    Ok(vec![])
  }

  async fn revert(&self, inputs: &TaskInputs, _outputs: Option<&Outputs>) -> ProviderResult<()> {
    self.db.mark_error(inputs.amphora_id()?).await
  }
}

/// Marks a spare amphora ready for allocation.
pub struct MarkAmphoraReady {
  db: Arc<dyn AmphoraRepository>,
}

impl MarkAmphoraReady {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    MarkAmphoraReady { db }
  }
}

#[async_trait]
impl WorkUnit for MarkAmphoraReady {
  fn name(&self) -> &str {
    "mark-amphora-ready"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let amphora = inputs.amphora()?;
    self.db.mark_ready(amphora.id).await?;
    info!(amphora = %amphora.id, "amphora ready");
    Ok(vec![])
  }

  async fn revert(&self, inputs: &TaskInputs, _outputs: Option<&Outputs>) -> ProviderResult<()> {
    self.db.mark_error(inputs.amphora()?.id).await
  }
}

/// Marks the amphora allocated to its load balancer.
pub struct MarkAmphoraAllocated {
  db: Arc<dyn AmphoraRepository>,
}

impl MarkAmphoraAllocated {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    MarkAmphoraAllocated { db }
  }
}

#[async_trait]
impl WorkUnit for MarkAmphoraAllocated {
  fn name(&self) -> &str {
    "mark-amphora-allocated"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId, FlowKey::LoadbalancerId]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let amphora_id = inputs.amphora_id()?;
    let lb_id = inputs.loadbalancer_id()?;
    self.db.mark_allocated(amphora_id, lb_id).await?;
    info!(amphora = %amphora_id, loadbalancer = %lb_id, "amphora allocated");
    Ok(vec![])
  }

  async fn revert(&self, inputs: &TaskInputs, _outputs: Option<&Outputs>) -> ProviderResult<()> {
    self.db.mark_error(inputs.amphora_id()?).await
  }
}

/// Marks the amphora pending-delete before its compute is torn down.
pub struct MarkAmphoraPendingDelete {
  db: Arc<dyn AmphoraRepository>,
}

impl MarkAmphoraPendingDelete {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    MarkAmphoraPendingDelete { db }
  }
}

#[async_trait]
impl WorkUnit for MarkAmphoraPendingDelete {
  fn name(&self) -> &str {
    "mark-amphora-pending-delete"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self.db.mark_pending_delete(inputs.amphora()?.id).await?;
    Ok(vec![])
  }

  async fn revert(&self, inputs: &TaskInputs, _outputs: Option<&Outputs>) -> ProviderResult<()> {
    self.db.mark_error(inputs.amphora()?.id).await
  }
}

/// Final marking of a deleted amphora. Must only run after the compute
/// instance is gone.
pub struct MarkAmphoraDeleted {
  db: Arc<dyn AmphoraRepository>,
}

impl MarkAmphoraDeleted {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    MarkAmphoraDeleted { db }
  }
}

#[async_trait]
impl WorkUnit for MarkAmphoraDeleted {
  fn name(&self) -> &str {
    "mark-amphora-deleted"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let amphora = inputs.amphora()?;
    self.db.mark_deleted(amphora.id).await?;
    info!(amphora = %amphora.id, "amphora deleted");
    Ok(vec![])
  }

  async fn revert(&self, inputs: &TaskInputs, _outputs: Option<&Outputs>) -> ProviderResult<()> {
    self.db.mark_error(inputs.amphora()?.id).await
  }
}

/// Suppresses health-driven actions while a delete or failover is running.
pub struct MarkAmphoraHealthBusy {
  db: Arc<dyn AmphoraRepository>,
}

impl MarkAmphoraHealthBusy {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    MarkAmphoraHealthBusy { db }
  }
}

#[async_trait]
impl WorkUnit for MarkAmphoraHealthBusy {
  fn name(&self) -> &str {
    "mark-amphora-health-busy"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self.db.mark_health_busy(inputs.amphora()?.id).await?;
    Ok(vec![])
  }
}

/// Stops health monitoring of an amphora being deleted.
pub struct DisableHealthMonitoring {
  db: Arc<dyn AmphoraRepository>,
}

impl DisableHealthMonitoring {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    DisableHealthMonitoring { db }
  }
}

#[async_trait]
impl WorkUnit for DisableHealthMonitoring {
  fn name(&self) -> &str {
    "disable-health-monitoring"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .db
      .disable_health_monitoring(inputs.amphora()?.id)
      .await?;
    Ok(vec![])
  }
}

/// Applies the role marking selected when the flow was built.
pub struct MarkAmphoraRole {
  db: Arc<dyn AmphoraRepository>,
  role: Role,
}

impl MarkAmphoraRole {
  pub fn new(db: Arc<dyn AmphoraRepository>, role: Role) -> Self {
    MarkAmphoraRole { db, role }
  }
}

#[async_trait]
impl WorkUnit for MarkAmphoraRole {
  fn name(&self) -> &str {
    match self.role {
      Role::Master => "mark-amphora-master",
      Role::Backup => "mark-amphora-backup",
      Role::Standalone => "mark-amphora-standalone",
    }
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self.db.mark_role(inputs.amphora()?.id, self.role).await?;
    Ok(vec![])
  }

  async fn revert(&self, inputs: &TaskInputs, _outputs: Option<&Outputs>) -> ProviderResult<()> {
    self.db.mark_error(inputs.amphora()?.id).await
  }
}

/// Persists the expiry of a freshly generated certificate.
pub struct PersistCertExpiration {
  db: Arc<dyn AmphoraRepository>,
}

impl PersistCertExpiration {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    PersistCertExpiration { db }
  }
}

#[async_trait]
impl WorkUnit for PersistCertExpiration {
  fn name(&self) -> &str {
    "persist-cert-expiration"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId, FlowKey::ServerPem]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self
      .db
      .update_cert_expiration(inputs.amphora_id()?, inputs.server_pem()?.expires_at)
      .await?;
    Ok(vec![])
  }
}

/// Clears the certificate-busy flag once a rotation has fully landed.
pub struct ClearCertBusy {
  db: Arc<dyn AmphoraRepository>,
}

impl ClearCertBusy {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    ClearCertBusy { db }
  }
}

#[async_trait]
impl WorkUnit for ClearCertBusy {
  fn name(&self) -> &str {
    "clear-cert-busy"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Amphora]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self.db.set_cert_busy(inputs.amphora()?.id, false).await?;
    Ok(vec![])
  }
}

/// Computes the replacement amphora's network details during failover, from
/// the ports captured off the failed amphora. Reads the replacement's id
/// only; the failed record is not consulted past this point.
pub struct CollectFailoverNetworkDetails {
  db: Arc<dyn AmphoraRepository>,
}

impl CollectFailoverNetworkDetails {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    CollectFailoverNetworkDetails { db }
  }
}

#[async_trait]
impl WorkUnit for CollectFailoverNetworkDetails {
  fn name(&self) -> &str {
    "collect-failover-network-details"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmphoraId, FlowKey::Ports]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::AmpsData]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let details = self
      .db
      .failover_network_details(inputs.amphora_id()?, inputs.ports()?)
      .await?;
    Ok(vec![(FlowKey::AmpsData, FlowValue::AmpsData(details))])
  }
}

/// Writes failover VIP data back onto the amphora rows.
pub struct ApplyVipData {
  db: Arc<dyn AmphoraRepository>,
}

impl ApplyVipData {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    ApplyVipData { db }
  }
}

#[async_trait]
impl WorkUnit for ApplyVipData {
  fn name(&self) -> &str {
    "apply-vip-data"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::AmpsData]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    self.db.apply_vip_data(inputs.amps_data()?).await?;
    Ok(vec![])
  }
}

/// Reads the authoritative load balancer record.
pub struct ReloadLoadbalancer {
  db: Arc<dyn AmphoraRepository>,
}

impl ReloadLoadbalancer {
  pub fn new(db: Arc<dyn AmphoraRepository>) -> Self {
    ReloadLoadbalancer { db }
  }
}

#[async_trait]
impl WorkUnit for ReloadLoadbalancer {
  fn name(&self) -> &str {
    "reload-loadbalancer"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::LoadbalancerId]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::Loadbalancer]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let lb = self
      .db
      .reload_loadbalancer(inputs.loadbalancer_id()?)
      .await?;
    Ok(vec![(FlowKey::Loadbalancer, FlowValue::Loadbalancer(lb))])
  }
}

/// Extracts the listeners from an already-loaded load balancer record.
pub struct ListListeners;

#[async_trait]
impl WorkUnit for ListListeners {
  fn name(&self) -> &str {
    "list-listeners"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Loadbalancer]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::Listeners]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let listeners = inputs.loadbalancer()?.listeners.clone();
    Ok(vec![(FlowKey::Listeners, FlowValue::Listeners(listeners))])
  }
}

/// Extracts the VIP from an already-loaded load balancer record.
pub struct FetchVip;

#[async_trait]
impl WorkUnit for FetchVip {
  fn name(&self) -> &str {
    "fetch-vip"
  }

  fn requires(&self) -> &[FlowKey] {
    &[FlowKey::Loadbalancer]
  }

  fn provides(&self) -> &[FlowKey] {
    &[FlowKey::Vip]
  }

  async fn execute(&self, inputs: &TaskInputs) -> ProviderResult<Outputs> {
    let vip = inputs.loadbalancer()?.vip.clone();
    Ok(vec![(FlowKey::Vip, FlowValue::Vip(vip))])
  }
}
