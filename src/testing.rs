//! Recording collaborator mocks shared by the unit tests.
//!
//! One [`Hub`] backs all five collaborators: every operation appends a
//! `"<collaborator>.<op> [args]"` line to the shared call list, and named
//! operations can be told to fail.

use std::collections::{HashSet, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::providers::{
  AmphoraRepository, ApplianceDriver, CertificateAuthority, ComputeProvider, NetworkProvider,
  ProviderError, ProviderResult, Providers,
};
use crate::types::{
  Amphora, AmphoraNetworkDetail, AmphoraStatus, CertBundle, ComputeInstance, ComputeStatus,
  Listener, Loadbalancer, NetworkConfig, Port, Role, Vip,
};

pub(crate) fn sample_amphora(id: Uuid) -> Amphora {
  Amphora {
    id,
    compute_id: Some(Uuid::new_v4()),
    status: AmphoraStatus::Ready,
    role: None,
    loadbalancer_id: None,
    lb_network_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10))),
    cert_expiration: None,
    cert_busy: false,
  }
}

pub(crate) fn sample_loadbalancer(id: Uuid) -> Loadbalancer {
  Loadbalancer {
    id,
    name: "lb-under-test".to_string(),
    vip: Vip {
      ip_address: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)),
      port_id: Uuid::new_v4(),
      network_id: Uuid::new_v4(),
    },
    listeners: vec![Listener {
      id: Uuid::new_v4(),
      protocol: "tcp".to_string(),
      protocol_port: 443,
      enabled: true,
    }],
  }
}

/// Shared state behind the mock collaborators.
pub(crate) struct Hub {
  calls: Mutex<Vec<String>>,
  fail: Mutex<HashSet<&'static str>>,
  spare: Mutex<Option<Uuid>>,
  statuses: Mutex<VecDeque<ComputeStatus>>,
}

impl Hub {
  pub fn new() -> Arc<Self> {
    Arc::new(Hub {
      calls: Mutex::new(Vec::new()),
      fail: Mutex::new(HashSet::new()),
      spare: Mutex::new(None),
      statuses: Mutex::new(VecDeque::new()),
    })
  }

  /// Makes every future call to `op` fail.
  pub fn fail_on(&self, op: &'static str) {
    self.fail.lock().expect("fail lock").insert(op);
  }

  /// Sets the spare-amphora lookup result.
  pub fn set_spare(&self, id: Option<Uuid>) {
    *self.spare.lock().expect("spare lock") = id;
  }

  /// Queues instance statuses for successive polls; once drained, polls
  /// report active.
  pub fn queue_statuses(&self, statuses: impl IntoIterator<Item = ComputeStatus>) {
    self
      .statuses
      .lock()
      .expect("status lock")
      .extend(statuses);
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().expect("calls lock").clone()
  }

  /// Ordered call names only (arguments stripped).
  pub fn call_names(&self) -> Vec<String> {
    self
      .calls()
      .iter()
      .map(|c| c.split_whitespace().next().unwrap_or_default().to_string())
      .collect()
  }

  pub fn count(&self, op: &str) -> usize {
    self.call_names().iter().filter(|n| *n == op).count()
  }

  fn hit(&self, op: &'static str, detail: String) -> ProviderResult<()> {
    let line = if detail.is_empty() {
      op.to_string()
    } else {
      format!("{op} {detail}")
    };
    self.calls.lock().expect("calls lock").push(line);
    if self.fail.lock().expect("fail lock").contains(op) {
      return Err(ProviderError::new(format!("{op} failed")));
    }
    Ok(())
  }

  fn next_status(&self) -> ComputeStatus {
    self
      .statuses
      .lock()
      .expect("status lock")
      .pop_front()
      .unwrap_or(ComputeStatus::Active)
  }
}

pub(crate) struct MockDb(pub Arc<Hub>);

#[async_trait]
impl AmphoraRepository for MockDb {
  async fn create_amphora(&self) -> ProviderResult<Uuid> {
    let id = Uuid::new_v4();
    self.0.hit("db.create_amphora", id.to_string())?;
    Ok(id)
  }

  async fn reload_amphora(&self, amphora_id: Uuid) -> ProviderResult<Amphora> {
    self.0.hit("db.reload_amphora", amphora_id.to_string())?;
    Ok(sample_amphora(amphora_id))
  }

  async fn find_spare_amphora(&self, loadbalancer_id: Uuid) -> ProviderResult<Option<Uuid>> {
    self
      .0
      .hit("db.find_spare_amphora", loadbalancer_id.to_string())?;
    Ok(*self.0.spare.lock().expect("spare lock"))
  }

  async fn refresh_from_compute(
    &self,
    amphora_id: Uuid,
    compute: &ComputeInstance,
  ) -> ProviderResult<()> {
    self
      .0
      .hit(
        "db.refresh_from_compute",
        format!("{amphora_id} {}", compute.id),
      )
  }

  async fn record_compute_id(&self, amphora_id: Uuid, compute_id: Uuid) -> ProviderResult<()> {
    self
      .0
      .hit("db.record_compute_id", format!("{amphora_id} {compute_id}"))
  }

  async fn associate_with_loadbalancer(
    &self,
    amphora_id: Uuid,
    loadbalancer_id: Uuid,
  ) -> ProviderResult<()> {
    self.0.hit(
      "db.associate_with_loadbalancer",
      format!("{amphora_id} {loadbalancer_id}"),
    )
  }

  async fn mark_booting(&self, amphora_id: Uuid, compute_id: Uuid) -> ProviderResult<()> {
    self
      .0
      .hit("db.mark_booting", format!("{amphora_id} {compute_id}"))
  }

  async fn mark_ready(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.0.hit("db.mark_ready", amphora_id.to_string())
  }

  async fn mark_allocated(&self, amphora_id: Uuid, loadbalancer_id: Uuid) -> ProviderResult<()> {
    self
      .0
      .hit("db.mark_allocated", format!("{amphora_id} {loadbalancer_id}"))
  }

  async fn mark_pending_delete(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.0.hit("db.mark_pending_delete", amphora_id.to_string())
  }

  async fn mark_deleted(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.0.hit("db.mark_deleted", amphora_id.to_string())
  }

  async fn mark_error(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.0.hit("db.mark_error", amphora_id.to_string())
  }

  async fn mark_role(&self, amphora_id: Uuid, role: Role) -> ProviderResult<()> {
    self.0.hit("db.mark_role", format!("{amphora_id} {role}"))
  }

  async fn mark_health_busy(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.0.hit("db.mark_health_busy", amphora_id.to_string())
  }

  async fn disable_health_monitoring(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self
      .0
      .hit("db.disable_health_monitoring", amphora_id.to_string())
  }

  async fn update_cert_expiration(
    &self,
    amphora_id: Uuid,
    expires_at: chrono::DateTime<Utc>,
  ) -> ProviderResult<()> {
    self
      .0
      .hit(
        "db.update_cert_expiration",
        format!("{amphora_id} {expires_at}"),
      )
  }

  async fn set_cert_busy(&self, amphora_id: Uuid, busy: bool) -> ProviderResult<()> {
    self
      .0
      .hit("db.set_cert_busy", format!("{amphora_id} {busy}"))
  }

  async fn failover_network_details(
    &self,
    replacement_id: Uuid,
    ports: &[Port],
  ) -> ProviderResult<Vec<AmphoraNetworkDetail>> {
    self.0.hit(
      "db.failover_network_details",
      format!("{replacement_id} {}", ports.len()),
    )?;
    Ok(vec![AmphoraNetworkDetail {
      amphora_id: replacement_id,
      vip_ip: ports.first().and_then(|p| p.fixed_ip),
      ha_port_id: ports.first().map(|p| p.id),
    }])
  }

  async fn apply_vip_data(&self, amps_data: &[AmphoraNetworkDetail]) -> ProviderResult<()> {
    let ids: Vec<String> = amps_data.iter().map(|d| d.amphora_id.to_string()).collect();
    self.0.hit("db.apply_vip_data", ids.join(" "))
  }

  async fn reload_loadbalancer(&self, loadbalancer_id: Uuid) -> ProviderResult<Loadbalancer> {
    self
      .0
      .hit("db.reload_loadbalancer", loadbalancer_id.to_string())?;
    Ok(sample_loadbalancer(loadbalancer_id))
  }
}

pub(crate) struct MockCompute(pub Arc<Hub>);

#[async_trait]
impl ComputeProvider for MockCompute {
  async fn create_instance(
    &self,
    amphora_id: Uuid,
    cert: Option<&CertBundle>,
  ) -> ProviderResult<Uuid> {
    let id = Uuid::new_v4();
    let kind = if cert.is_some() { "with-cert" } else { "plain" };
    self
      .0
      .hit("compute.create_instance", format!("{amphora_id} {kind} {id}"))?;
    Ok(id)
  }

  async fn get_instance(&self, compute_id: Uuid) -> ProviderResult<ComputeInstance> {
    self.0.hit("compute.get_instance", compute_id.to_string())?;
    Ok(ComputeInstance {
      id: compute_id,
      status: self.0.next_status(),
      lb_network_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 20))),
    })
  }

  async fn delete_instance(&self, compute_id: Uuid) -> ProviderResult<()> {
    self.0.hit("compute.delete_instance", compute_id.to_string())
  }
}

pub(crate) struct MockCerts(pub Arc<Hub>);

#[async_trait]
impl CertificateAuthority for MockCerts {
  async fn generate_server_cert(&self) -> ProviderResult<CertBundle> {
    self.0.hit("certs.generate_server_cert", String::new())?;
    Ok(CertBundle {
      pem: "-----BEGIN CERTIFICATE-----\ntest\n-----END CERTIFICATE-----\n".to_string(),
      expires_at: Utc::now() + Duration::days(30),
    })
  }
}

pub(crate) struct MockNetwork(pub Arc<Hub>);

#[async_trait]
impl NetworkProvider for MockNetwork {
  async fn ports_excluding_lb_network(&self, amphora: &Amphora) -> ProviderResult<Vec<Port>> {
    self
      .0
      .hit("network.ports_excluding_lb_network", amphora.id.to_string())?;
    Ok(vec![Port {
      id: Uuid::new_v4(),
      network_id: Uuid::new_v4(),
      fixed_ip: None,
    }])
  }

  async fn prepare_failover(&self, amphora: &Amphora) -> ProviderResult<()> {
    self.0.hit("network.prepare_failover", amphora.id.to_string())
  }

  async fn network_config(&self, loadbalancer: &Loadbalancer) -> ProviderResult<NetworkConfig> {
    self
      .0
      .hit("network.network_config", loadbalancer.id.to_string())?;
    Ok(NetworkConfig {
      vip_subnet_id: Uuid::new_v4(),
      vip_port_id: loadbalancer.vip.port_id,
      amphorae: Default::default(),
    })
  }

  async fn member_ports(
    &self,
    loadbalancer: &Loadbalancer,
    amphora: &Amphora,
  ) -> ProviderResult<Vec<Port>> {
    self.0.hit(
      "network.member_ports",
      format!("{} {}", loadbalancer.id, amphora.id),
    )?;
    Ok(vec![Port {
      id: Uuid::new_v4(),
      network_id: loadbalancer.vip.network_id,
      fixed_ip: None,
    }])
  }

  async fn plug_vip(
    &self,
    loadbalancer: &Loadbalancer,
    _config: &NetworkConfig,
  ) -> ProviderResult<()> {
    self.0.hit("network.plug_vip", loadbalancer.id.to_string())
  }

  async fn plug_ports(&self, amphora: &Amphora, ports: &[Port]) -> ProviderResult<()> {
    self.0.hit(
      "network.plug_ports",
      format!("{} {}", amphora.id, ports.len()),
    )
  }
}

pub(crate) struct MockAppliance(pub Arc<Hub>);

#[async_trait]
impl ApplianceDriver for MockAppliance {
  async fn finalize(&self, amphora: &Amphora) -> ProviderResult<()> {
    self.0.hit("appliance.finalize", amphora.id.to_string())
  }

  async fn upload_cert(&self, amphora: &Amphora, _cert: &CertBundle) -> ProviderResult<()> {
    self.0.hit("appliance.upload_cert", amphora.id.to_string())
  }

  async fn update_listeners(&self, listeners: &[Listener], _vip: &Vip) -> ProviderResult<()> {
    self
      .0
      .hit("appliance.update_listeners", listeners.len().to_string())
  }

  async fn start_listeners(&self, listeners: &[Listener], _vip: &Vip) -> ProviderResult<()> {
    self
      .0
      .hit("appliance.start_listeners", listeners.len().to_string())
  }
}

/// Bundles mocks around one hub.
pub(crate) fn mock_providers(hub: &Arc<Hub>) -> Providers {
  Providers {
    database: Arc::new(MockDb(Arc::clone(hub))),
    compute: Arc::new(MockCompute(Arc::clone(hub))),
    certs: Arc::new(MockCerts(Arc::clone(hub))),
    network: Arc::new(MockNetwork(Arc::clone(hub))),
    appliance: Arc::new(MockAppliance(Arc::clone(hub))),
  }
}
