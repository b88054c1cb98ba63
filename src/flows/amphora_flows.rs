//! Factory for the amphora lifecycle flows.
//!
//! Flow shapes mirror the controller's lifecycle events: create a spare,
//! find-or-create an amphora for a load balancer, delete, failover, and
//! certificate rotation. Driver mode and role are resolved here, while the
//! flows are being built; a produced flow contains no runtime switches on
//! either.

use tracing::debug;

use crate::config::{DriverMode, FlowConfig};
use crate::error::FlowError;
use crate::flow::{Decider, Flow, FlowNode, GraphFlow, RetryFlow, Sequence, UnitNode};
use crate::providers::Providers;
use crate::tasks::{
  ApplyVipData, AssociateWithLoadbalancer, ClearCertBusy, CollectFailoverNetworkDetails,
  CreateAmphoraRecord, CreateCompute, CreateComputeWithCert, DeleteCompute,
  DisableHealthMonitoring, FetchNetworkConfig, FetchVip, FinalizeAmphora, GenerateServerCert,
  ListListeners, ListMemberPorts, ListPortsExcludingLbNetwork, MapSpareToLoadbalancer,
  MarkAmphoraAllocated, MarkAmphoraBooting, MarkAmphoraDeleted, MarkAmphoraHealthBusy,
  MarkAmphoraPendingDelete, MarkAmphoraReady, MarkAmphoraRole, PersistCertExpiration, PlugPorts,
  PlugVip, PrepareFailover, RecordComputeId, RefreshAmphoraFromCompute, ReloadAmphora,
  ReloadLoadbalancer, StartListeners, UpdateListeners, UploadCert, WaitComputeActive,
};
use crate::types::{FlowKey, FlowValue, Role};

fn spare_amphora_found(value: &FlowValue) -> bool {
  value.is_present()
}

fn spare_amphora_missing(value: &FlowValue) -> bool {
  !value.is_present()
}

/// Builds the lifecycle flows from one configuration and one set of
/// collaborators.
pub struct AmphoraFlows {
  config: FlowConfig,
  providers: Providers,
}

impl AmphoraFlows {
  pub fn new(config: FlowConfig, providers: Providers) -> Self {
    debug!(driver = ?config.driver, retries = config.amp_active_retries, "building flow factory");
    AmphoraFlows { config, providers }
  }

  /// Flow that provisions a spare amphora and marks it ready.
  pub fn create_amphora_flow(&self) -> Result<Flow, FlowError> {
    let db = &self.providers.database;
    let mut seq = Sequence::new("create-amphora");
    seq.add(UnitNode::new(CreateAmphoraRecord::new(db.clone())));
    for node in self.provisioning(true, None) {
      seq.add(node);
    }
    seq.add(UnitNode::new(MarkAmphoraBooting::new(db.clone())));
    seq.add(self.wait_for_active(None));
    seq.add(UnitNode::new(ReloadAmphora::new(db.clone())));
    seq.add(UnitNode::new(FinalizeAmphora::new(
      self.providers.appliance.clone(),
    )));
    seq.add(UnitNode::new(MarkAmphoraReady::new(db.clone())));
    Flow::build("create-amphora", seq, &[])
  }

  /// Sub-flow that maps a spare amphora to the load balancer, or provisions
  /// a new one when no spare exists. `prefix` keeps unit names unique when
  /// the sub-flow is nested; `role` selects the marking applied either way.
  pub fn get_amphora_for_lb_subflow(&self, prefix: &str, role: Role) -> Result<Flow, FlowError> {
    let sf = format!("{prefix}-get-amphora-for-lb");
    let db = &self.providers.database;

    let map = UnitNode::new(MapSpareToLoadbalancer::new(db.clone()))
      .named(format!("{sf}-map-spare-to-loadbalancer"));
    let map_name = map.name().to_string();

    let existing_sf = format!("{sf}-existing");
    let existing = Sequence::new(existing_sf.clone())
      .with(
        UnitNode::new(ReloadAmphora::new(db.clone()))
          .named(format!("{existing_sf}-reload-amphora"))
          .rebind(FlowKey::AmphoraId, FlowKey::SpareAmphoraId),
      )
      .with(
        UnitNode::new(MarkAmphoraRole::new(db.clone(), role))
          .named(format!("{existing_sf}-mark-amphora-{role}")),
      );
    let existing_name = existing.name().to_string();

    let provision = self.provision_for_lb_sequence(&sf, role);
    let provision_name = provision.name().to_string();

    let graph = GraphFlow::new(sf.clone())
      .with(map)
      .with(existing)
      .with(provision)
      .link_when(
        map_name.clone(),
        existing_name,
        Decider::new("spare-amphora-found", spare_amphora_found),
      )
      .link_when(
        map_name,
        provision_name,
        Decider::new("spare-amphora-missing", spare_amphora_missing),
      );
    Flow::build(sf, graph, &[FlowKey::LoadbalancerId])
  }

  /// Flow that tears an amphora down. Strictly ordered: the record is only
  /// marked deleted once the compute instance is gone.
  pub fn delete_amphora_flow(&self) -> Result<Flow, FlowError> {
    let db = &self.providers.database;
    let seq = Sequence::new("delete-amphora")
      .with(UnitNode::new(MarkAmphoraPendingDelete::new(db.clone())))
      .with(UnitNode::new(MarkAmphoraHealthBusy::new(db.clone())))
      .with(UnitNode::new(DeleteCompute::new(
        self.providers.compute.clone(),
      )))
      .with(UnitNode::new(DisableHealthMonitoring::new(db.clone())))
      .with(UnitNode::new(MarkAmphoraDeleted::new(db.clone())));
    Flow::build("delete-amphora", seq, &[FlowKey::Amphora])
  }

  /// Flow that replaces a failed amphora. The failed record stays bound to
  /// the `amphora` key; every step after the replacement is created reads the
  /// replacement through its own bindings.
  pub fn failover_flow(&self) -> Result<Flow, FlowError> {
    let db = &self.providers.database;
    let network = &self.providers.network;
    let appliance = &self.providers.appliance;

    let mut seq = Sequence::new("failover-amphora");
    seq.add(UnitNode::new(ListPortsExcludingLbNetwork::new(
      network.clone(),
    )));
    seq.add(UnitNode::new(PrepareFailover::new(network.clone())));
    // Inline delete of the failed amphora.
    seq.add(UnitNode::new(MarkAmphoraPendingDelete::new(db.clone())));
    seq.add(UnitNode::new(MarkAmphoraHealthBusy::new(db.clone())));
    seq.add(UnitNode::new(DeleteCompute::new(
      self.providers.compute.clone(),
    )));
    seq.add(UnitNode::new(DisableHealthMonitoring::new(db.clone())));
    seq.add(UnitNode::new(MarkAmphoraDeleted::new(db.clone())));
    // Replacement provisioning; `amphora_id` is the replacement from here on.
    seq.add(UnitNode::new(CreateAmphoraRecord::new(db.clone())));
    seq.add(UnitNode::new(CollectFailoverNetworkDetails::new(db.clone())));
    for node in self.provisioning(false, None) {
      seq.add(node);
    }
    seq.add(UnitNode::new(RecordComputeId::new(db.clone())));
    seq.add(UnitNode::new(AssociateWithLoadbalancer::new(db.clone())));
    seq.add(UnitNode::new(MarkAmphoraBooting::new(db.clone())));
    seq.add(self.wait_for_active(None));
    seq.add(
      UnitNode::new(ReloadAmphora::new(db.clone()))
        .named("reload-failover-amphora")
        .provides_as(FlowKey::Amphora, FlowKey::FailoverAmphora),
    );
    seq.add(
      UnitNode::new(FinalizeAmphora::new(appliance.clone()))
        .named("finalize-failover-amphora")
        .rebind(FlowKey::Amphora, FlowKey::FailoverAmphora),
    );
    seq.add(UnitNode::new(ApplyVipData::new(db.clone())));
    seq.add(UnitNode::new(ReloadLoadbalancer::new(db.clone())));
    seq.add(UnitNode::new(FetchNetworkConfig::new(network.clone())));
    seq.add(UnitNode::new(ListListeners));
    seq.add(UnitNode::new(FetchVip));
    seq.add(UnitNode::new(UpdateListeners::new(appliance.clone())));
    seq.add(UnitNode::new(PlugVip::new(network.clone())));
    seq.add(
      UnitNode::new(ListMemberPorts::new(network.clone()))
        .rebind(FlowKey::Amphora, FlowKey::FailoverAmphora),
    );
    seq.add(
      UnitNode::new(PlugPorts::new(network.clone()))
        .named("plug-member-ports")
        .rebind(FlowKey::Amphora, FlowKey::FailoverAmphora)
        .rebind(FlowKey::Ports, FlowKey::MemberPorts),
    );
    seq.add(UnitNode::new(StartListeners::new(appliance.clone())));
    seq.add(UnitNode::new(MarkAmphoraAllocated::new(db.clone())));
    Flow::build(
      "failover-amphora",
      seq,
      &[FlowKey::Amphora, FlowKey::LoadbalancerId],
    )
  }

  /// Flow that rotates an amphora's server certificate. The cert-busy flag
  /// clears only after the upload and the expiry persist both succeed.
  pub fn cert_rotate_flow(&self) -> Result<Flow, FlowError> {
    let db = &self.providers.database;
    let seq = Sequence::new("cert-rotate-amphora")
      .with(UnitNode::new(GenerateServerCert::new(
        self.providers.certs.clone(),
      )))
      .with(UnitNode::new(UploadCert::new(
        self.providers.appliance.clone(),
      )))
      .with(UnitNode::new(PersistCertExpiration::new(db.clone())))
      .with(UnitNode::new(ClearCertBusy::new(db.clone())));
    Flow::build(
      "cert-rotate-amphora",
      seq,
      &[FlowKey::Amphora, FlowKey::AmphoraId],
    )
  }

  /// The "not found" branch of [`Self::get_amphora_for_lb_subflow`]: the
  /// create-amphora provisioning plus allocation to the load balancer.
  fn provision_for_lb_sequence(&self, sf: &str, role: Role) -> Sequence {
    let db = &self.providers.database;
    let psf = format!("{sf}-provision");

    let mut seq = Sequence::new(psf.clone());
    seq.add(
      UnitNode::new(CreateAmphoraRecord::new(db.clone()))
        .named(format!("{psf}-create-amphora-record")),
    );
    for node in self.provisioning(true, Some(psf.as_str())) {
      seq.add(node);
    }
    seq.add(
      UnitNode::new(RecordComputeId::new(db.clone())).named(format!("{psf}-record-compute-id")),
    );
    seq.add(
      UnitNode::new(MarkAmphoraBooting::new(db.clone()))
        .named(format!("{psf}-mark-amphora-booting")),
    );
    seq.add(self.wait_for_active(Some(psf.as_str())));
    seq.add(
      UnitNode::new(MarkAmphoraAllocated::new(db.clone()))
        .named(format!("{psf}-mark-amphora-allocated")),
    );
    seq.add(UnitNode::new(ReloadAmphora::new(db.clone())).named(format!("{psf}-reload-amphora")));
    seq.add(
      UnitNode::new(FinalizeAmphora::new(self.providers.appliance.clone()))
        .named(format!("{psf}-finalize-amphora")),
    );
    seq.add(
      UnitNode::new(MarkAmphoraRole::new(db.clone(), role))
        .named(format!("{psf}-mark-amphora-{role}")),
    );
    seq
  }

  /// Driver-mode provisioning branch, chosen once per factory. The failover
  /// flow skips the expiry persist, as rotation owns that field afterwards.
  fn provisioning(&self, persist_expiry: bool, prefix: Option<&str>) -> Vec<FlowNode> {
    let name = |base: &str| match prefix {
      Some(p) => format!("{p}-{base}"),
      None => base.to_string(),
    };
    match self.config.driver {
      DriverMode::CertBundled => {
        let mut nodes: Vec<FlowNode> = Vec::new();
        nodes.push(
          UnitNode::new(GenerateServerCert::new(self.providers.certs.clone()))
            .named(name("generate-server-cert"))
            .into(),
        );
        if persist_expiry {
          nodes.push(
            UnitNode::new(PersistCertExpiration::new(self.providers.database.clone()))
              .named(name("persist-cert-expiration"))
              .into(),
          );
        }
        nodes.push(
          UnitNode::new(CreateComputeWithCert::new(self.providers.compute.clone()))
            .named(name("create-compute-with-cert"))
            .into(),
        );
        nodes
      }
      DriverMode::Plain => vec![
        UnitNode::new(CreateCompute::new(self.providers.compute.clone()))
          .named(name("create-compute"))
          .into(),
      ],
    }
  }

  /// Bounded wait loop: poll the instance, then refresh the record from what
  /// the poll reported.
  fn wait_for_active(&self, prefix: Option<&str>) -> RetryFlow {
    let name = |base: &str| match prefix {
      Some(p) => format!("{p}-{base}"),
      None => base.to_string(),
    };
    let body = Sequence::new(name("poll-compute"))
      .with(
        UnitNode::new(WaitComputeActive::new(self.providers.compute.clone()))
          .named(name("wait-compute-active")),
      )
      .with(
        UnitNode::new(RefreshAmphoraFromCompute::new(self.providers.database.clone()))
          .named(name("refresh-amphora-from-compute")),
      );
    RetryFlow::new(
      name("wait-for-amphora"),
      self.config.amp_active_retries,
      self.config.amp_active_wait(),
      body,
    )
  }
}
