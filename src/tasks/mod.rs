//! Work units for the amphora lifecycle, one per collaborator operation.
//!
//! Each unit holds the `Arc` of the collaborator it delegates to and declares
//! the symbolic keys it consumes and produces; the flow factory wires them
//! together.

mod appliance;
mod certs;
mod compute;
mod database;
mod network;

pub use appliance::{FinalizeAmphora, StartListeners, UpdateListeners, UploadCert};
pub use certs::GenerateServerCert;
pub use compute::{CreateCompute, CreateComputeWithCert, DeleteCompute, WaitComputeActive};
pub use database::{
  ApplyVipData, AssociateWithLoadbalancer, ClearCertBusy, CollectFailoverNetworkDetails,
  CreateAmphoraRecord, DisableHealthMonitoring, FetchVip, ListListeners, MapSpareToLoadbalancer,
  MarkAmphoraAllocated, MarkAmphoraBooting, MarkAmphoraDeleted, MarkAmphoraHealthBusy,
  MarkAmphoraPendingDelete, MarkAmphoraReady, MarkAmphoraRole, PersistCertExpiration,
  RecordComputeId, RefreshAmphoraFromCompute, ReloadAmphora, ReloadLoadbalancer,
};
pub use network::{
  FetchNetworkConfig, ListMemberPorts, ListPortsExcludingLbNetwork, PlugPorts, PlugVip,
  PrepareFailover,
};
