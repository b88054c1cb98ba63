//! End-to-end lifecycle runs against an in-memory control plane: create,
//! find-or-create, certificate rotation, failover, and delete, including the
//! bounded wait for compute to report active.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use amphora_flows::providers::{
  AmphoraRepository, ApplianceDriver, CertificateAuthority, ComputeProvider, NetworkProvider,
  ProviderError, ProviderResult, Providers,
};
use amphora_flows::types::{
  Amphora, AmphoraNetworkDetail, AmphoraStatus, CertBundle, ComputeInstance, ComputeStatus,
  Listener, Loadbalancer, NetworkConfig, Port, Role, Vip,
};
use amphora_flows::{AmphoraFlows, DataStore, DriverMode, FlowConfig, FlowKey, FlowValue};

fn init_tracing() {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// In-memory stand-in for the whole collaborator surface.
struct ControlPlane {
  amphorae: Mutex<HashMap<Uuid, Amphora>>,
  computes: Mutex<HashMap<Uuid, ComputeInstance>>,
  spare: Mutex<Option<Uuid>>,
  /// Polls that report `Building` before the instance turns active.
  polls_before_active: Mutex<u32>,
  actions: Mutex<Vec<String>>,
}

impl ControlPlane {
  fn new() -> Arc<Self> {
    Arc::new(ControlPlane {
      amphorae: Mutex::new(HashMap::new()),
      computes: Mutex::new(HashMap::new()),
      spare: Mutex::new(None),
      polls_before_active: Mutex::new(0),
      actions: Mutex::new(Vec::new()),
    })
  }

  fn note(&self, action: impl Into<String>) {
    self.actions.lock().expect("actions").push(action.into());
  }

  fn actions(&self) -> Vec<String> {
    self.actions.lock().expect("actions").clone()
  }

  fn set_polls_before_active(&self, polls: u32) {
    *self.polls_before_active.lock().expect("polls") = polls;
  }

  fn amphora(&self, id: Uuid) -> Amphora {
    self
      .amphorae
      .lock()
      .expect("amphorae")
      .get(&id)
      .cloned()
      .expect("amphora row")
  }

  fn insert_amphora(&self, amphora: Amphora) {
    self
      .amphorae
      .lock()
      .expect("amphorae")
      .insert(amphora.id, amphora);
  }

  fn insert_compute(&self, id: Uuid) {
    self.computes.lock().expect("computes").insert(
      id,
      ComputeInstance {
        id,
        status: ComputeStatus::Active,
        lb_network_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 30))),
      },
    );
  }

  fn compute_exists(&self, id: Uuid) -> bool {
    self.computes.lock().expect("computes").contains_key(&id)
  }

  fn with_row<T>(
    &self,
    id: Uuid,
    update: impl FnOnce(&mut Amphora) -> T,
  ) -> ProviderResult<T> {
    let mut rows = self.amphorae.lock().expect("amphorae");
    let row = rows
      .get_mut(&id)
      .ok_or_else(|| ProviderError::new(format!("amphora {id} not found")))?;
    Ok(update(row))
  }
}

fn flows(plane: &Arc<ControlPlane>, driver: DriverMode) -> AmphoraFlows {
  let config = FlowConfig {
    driver,
    amp_active_retries: 5,
    amp_active_wait_secs: 0,
  };
  let providers = Providers {
    database: Arc::clone(plane) as Arc<dyn AmphoraRepository>,
    compute: Arc::clone(plane) as Arc<dyn ComputeProvider>,
    certs: Arc::clone(plane) as Arc<dyn CertificateAuthority>,
    network: Arc::clone(plane) as Arc<dyn NetworkProvider>,
    appliance: Arc::clone(plane) as Arc<dyn ApplianceDriver>,
  };
  AmphoraFlows::new(config, providers)
}

#[async_trait]
impl AmphoraRepository for ControlPlane {
  async fn create_amphora(&self) -> ProviderResult<Uuid> {
    let id = Uuid::new_v4();
    self.insert_amphora(Amphora {
      id,
      compute_id: None,
      status: AmphoraStatus::Booting,
      role: None,
      loadbalancer_id: None,
      lb_network_ip: None,
      cert_expiration: None,
      cert_busy: false,
    });
    Ok(id)
  }

  async fn reload_amphora(&self, amphora_id: Uuid) -> ProviderResult<Amphora> {
    self.with_row(amphora_id, |row| row.clone())
  }

  async fn find_spare_amphora(&self, loadbalancer_id: Uuid) -> ProviderResult<Option<Uuid>> {
    let spare = *self.spare.lock().expect("spare");
    if let Some(id) = spare {
      self.with_row(id, |row| row.loadbalancer_id = Some(loadbalancer_id))?;
    }
    Ok(spare)
  }

  async fn refresh_from_compute(
    &self,
    amphora_id: Uuid,
    compute: &ComputeInstance,
  ) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| row.lb_network_ip = compute.lb_network_ip)
  }

  async fn record_compute_id(&self, amphora_id: Uuid, compute_id: Uuid) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| row.compute_id = Some(compute_id))
  }

  async fn associate_with_loadbalancer(
    &self,
    amphora_id: Uuid,
    loadbalancer_id: Uuid,
  ) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| {
      row.loadbalancer_id = Some(loadbalancer_id)
    })
  }

  async fn mark_booting(&self, amphora_id: Uuid, compute_id: Uuid) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| {
      row.status = AmphoraStatus::Booting;
      row.compute_id = Some(compute_id);
    })
  }

  async fn mark_ready(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| row.status = AmphoraStatus::Ready)
  }

  async fn mark_allocated(&self, amphora_id: Uuid, loadbalancer_id: Uuid) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| {
      row.status = AmphoraStatus::Allocated;
      row.loadbalancer_id = Some(loadbalancer_id);
    })
  }

  async fn mark_pending_delete(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| row.status = AmphoraStatus::PendingDelete)
  }

  async fn mark_deleted(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| row.status = AmphoraStatus::Deleted)
  }

  async fn mark_error(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| row.status = AmphoraStatus::Error)
  }

  async fn mark_role(&self, amphora_id: Uuid, role: Role) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| row.role = Some(role))
  }

  async fn mark_health_busy(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.note(format!("health-busy {amphora_id}"));
    Ok(())
  }

  async fn disable_health_monitoring(&self, amphora_id: Uuid) -> ProviderResult<()> {
    self.note(format!("health-disabled {amphora_id}"));
    Ok(())
  }

  async fn update_cert_expiration(
    &self,
    amphora_id: Uuid,
    expires_at: DateTime<Utc>,
  ) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| row.cert_expiration = Some(expires_at))
  }

  async fn set_cert_busy(&self, amphora_id: Uuid, busy: bool) -> ProviderResult<()> {
    self.with_row(amphora_id, |row| row.cert_busy = busy)
  }

  async fn failover_network_details(
    &self,
    replacement_id: Uuid,
    ports: &[Port],
  ) -> ProviderResult<Vec<AmphoraNetworkDetail>> {
    Ok(vec![AmphoraNetworkDetail {
      amphora_id: replacement_id,
      vip_ip: ports.first().and_then(|p| p.fixed_ip),
      ha_port_id: ports.first().map(|p| p.id),
    }])
  }

  async fn apply_vip_data(&self, amps_data: &[AmphoraNetworkDetail]) -> ProviderResult<()> {
    for detail in amps_data {
      self.note(format!("vip-data {}", detail.amphora_id));
    }
    Ok(())
  }

  async fn reload_loadbalancer(&self, loadbalancer_id: Uuid) -> ProviderResult<Loadbalancer> {
    Ok(Loadbalancer {
      id: loadbalancer_id,
      name: "integration-lb".to_string(),
      vip: Vip {
        ip_address: IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)),
        port_id: Uuid::new_v4(),
        network_id: Uuid::new_v4(),
      },
      listeners: vec![Listener {
        id: Uuid::new_v4(),
        protocol: "tcp".to_string(),
        protocol_port: 80,
        enabled: true,
      }],
    })
  }
}

#[async_trait]
impl ComputeProvider for ControlPlane {
  async fn create_instance(
    &self,
    _amphora_id: Uuid,
    _cert: Option<&CertBundle>,
  ) -> ProviderResult<Uuid> {
    let id = Uuid::new_v4();
    self.computes.lock().expect("computes").insert(
      id,
      ComputeInstance {
        id,
        status: ComputeStatus::Building,
        lb_network_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 40))),
      },
    );
    Ok(id)
  }

  async fn get_instance(&self, compute_id: Uuid) -> ProviderResult<ComputeInstance> {
    let status = {
      let mut polls = self.polls_before_active.lock().expect("polls");
      if *polls > 0 {
        *polls -= 1;
        ComputeStatus::Building
      } else {
        ComputeStatus::Active
      }
    };
    let mut computes = self.computes.lock().expect("computes");
    let instance = computes
      .get_mut(&compute_id)
      .ok_or_else(|| ProviderError::new(format!("instance {compute_id} not found")))?;
    instance.status = status;
    Ok(instance.clone())
  }

  async fn delete_instance(&self, compute_id: Uuid) -> ProviderResult<()> {
    self
      .computes
      .lock()
      .expect("computes")
      .remove(&compute_id)
      .map(|_| ())
      .ok_or_else(|| ProviderError::new(format!("instance {compute_id} not found")))
  }
}

#[async_trait]
impl CertificateAuthority for ControlPlane {
  async fn generate_server_cert(&self) -> ProviderResult<CertBundle> {
    Ok(CertBundle {
      pem: "-----BEGIN CERTIFICATE-----\nintegration\n-----END CERTIFICATE-----\n".to_string(),
      expires_at: Utc::now() + Duration::days(90),
    })
  }
}

#[async_trait]
impl NetworkProvider for ControlPlane {
  async fn ports_excluding_lb_network(&self, amphora: &Amphora) -> ProviderResult<Vec<Port>> {
    Ok(vec![Port {
      id: Uuid::new_v4(),
      network_id: Uuid::new_v4(),
      fixed_ip: amphora.lb_network_ip,
    }])
  }

  async fn prepare_failover(&self, amphora: &Amphora) -> ProviderResult<()> {
    self.note(format!("failover-prepared {}", amphora.id));
    Ok(())
  }

  async fn network_config(&self, loadbalancer: &Loadbalancer) -> ProviderResult<NetworkConfig> {
    Ok(NetworkConfig {
      vip_subnet_id: Uuid::new_v4(),
      vip_port_id: loadbalancer.vip.port_id,
      amphorae: HashMap::new(),
    })
  }

  async fn member_ports(
    &self,
    loadbalancer: &Loadbalancer,
    _amphora: &Amphora,
  ) -> ProviderResult<Vec<Port>> {
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
    self.note(format!("vip-plugged {}", loadbalancer.id));
    Ok(())
  }

  async fn plug_ports(&self, amphora: &Amphora, ports: &[Port]) -> ProviderResult<()> {
    self.note(format!("ports-plugged {} {}", amphora.id, ports.len()));
    Ok(())
  }
}

#[async_trait]
impl ApplianceDriver for ControlPlane {
  async fn finalize(&self, amphora: &Amphora) -> ProviderResult<()> {
    self.note(format!("finalized {}", amphora.id));
    Ok(())
  }

  async fn upload_cert(&self, amphora: &Amphora, _cert: &CertBundle) -> ProviderResult<()> {
    self.note(format!("cert-uploaded {}", amphora.id));
    Ok(())
  }

  async fn update_listeners(&self, _listeners: &[Listener], _vip: &Vip) -> ProviderResult<()> {
    self.note("listeners-updated");
    Ok(())
  }

  async fn start_listeners(&self, _listeners: &[Listener], _vip: &Vip) -> ProviderResult<()> {
    self.note("listeners-started");
    Ok(())
  }
}

#[tokio::test]
async fn create_lifecycle_reaches_ready_after_slow_boot() {
  init_tracing();
  let plane = ControlPlane::new();
  plane.set_polls_before_active(2);
  let flow = flows(&plane, DriverMode::CertBundled)
    .create_amphora_flow()
    .expect("build");

  let mut store = DataStore::new();
  flow.run(&mut store).await.expect("run");

  let amphora_id = store
    .get(FlowKey::AmphoraId)
    .and_then(|v| v.as_amphora_id())
    .expect("amphora id");
  let row = plane.amphora(amphora_id);
  assert_eq!(row.status, AmphoraStatus::Ready);
  assert!(row.cert_expiration.is_some());
  assert!(row.lb_network_ip.is_some());
  let compute_id = row.compute_id.expect("compute id");
  assert!(plane.compute_exists(compute_id));
  assert!(plane.actions().contains(&format!("finalized {amphora_id}")));
}

#[tokio::test]
async fn cert_rotation_updates_expiry_and_clears_busy() {
  let plane = ControlPlane::new();
  let flow = flows(&plane, DriverMode::CertBundled)
    .create_amphora_flow()
    .expect("build");
  let mut store = DataStore::new();
  flow.run(&mut store).await.expect("create");
  let amphora_id = store
    .get(FlowKey::AmphoraId)
    .and_then(|v| v.as_amphora_id())
    .expect("amphora id");

  // Simulate a health manager flagging the rotation.
  plane
    .set_cert_busy(amphora_id, true)
    .await
    .expect("set busy");
  let before = plane.amphora(amphora_id).cert_expiration.expect("expiry");

  let rotate = flows(&plane, DriverMode::CertBundled)
    .cert_rotate_flow()
    .expect("build");
  let row = plane.amphora(amphora_id);
  let mut store = DataStore::seeded([
    (FlowKey::AmphoraId, FlowValue::AmphoraId(amphora_id)),
    (FlowKey::Amphora, FlowValue::Amphora(row)),
  ]);
  rotate.run(&mut store).await.expect("rotate");

  let row = plane.amphora(amphora_id);
  assert!(!row.cert_busy);
  assert!(row.cert_expiration.expect("expiry") >= before);
  assert!(plane.actions().contains(&format!("cert-uploaded {amphora_id}")));
}

#[tokio::test]
async fn get_amphora_for_lb_prefers_the_spare() {
  let plane = ControlPlane::new();
  let spare_id = Uuid::new_v4();
  plane.insert_amphora(Amphora {
    id: spare_id,
    compute_id: Some(Uuid::new_v4()),
    status: AmphoraStatus::Ready,
    role: None,
    loadbalancer_id: None,
    lb_network_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 50))),
    cert_expiration: None,
    cert_busy: false,
  });
  *plane.spare.lock().expect("spare") = Some(spare_id);

  let flow = flows(&plane, DriverMode::Plain)
    .get_amphora_for_lb_subflow("lb-create", Role::Master)
    .expect("build");
  let lb_id = Uuid::new_v4();
  let mut store = DataStore::seeded([(FlowKey::LoadbalancerId, FlowValue::LoadbalancerId(lb_id))]);
  flow.run(&mut store).await.expect("run");

  let row = plane.amphora(spare_id);
  assert_eq!(row.role, Some(Role::Master));
  assert_eq!(row.loadbalancer_id, Some(lb_id));
  // The spare was used as-is; nothing new was provisioned.
  assert_eq!(plane.amphorae.lock().expect("amphorae").len(), 1);
}

#[tokio::test]
async fn get_amphora_for_lb_provisions_when_no_spare_exists() {
  let plane = ControlPlane::new();
  let flow = flows(&plane, DriverMode::Plain)
    .get_amphora_for_lb_subflow("lb-create", Role::Standalone)
    .expect("build");
  let lb_id = Uuid::new_v4();
  let mut store = DataStore::seeded([(FlowKey::LoadbalancerId, FlowValue::LoadbalancerId(lb_id))]);
  flow.run(&mut store).await.expect("run");

  let rows = plane.amphorae.lock().expect("amphorae");
  assert_eq!(rows.len(), 1);
  let row = rows.values().next().expect("row");
  assert_eq!(row.status, AmphoraStatus::Allocated);
  assert_eq!(row.role, Some(Role::Standalone));
  assert_eq!(row.loadbalancer_id, Some(lb_id));
}

#[tokio::test]
async fn delete_lifecycle_removes_compute_then_marks_deleted() {
  let plane = ControlPlane::new();
  let flow = flows(&plane, DriverMode::Plain)
    .create_amphora_flow()
    .expect("build");
  let mut store = DataStore::new();
  flow.run(&mut store).await.expect("create");
  let amphora_id = store
    .get(FlowKey::AmphoraId)
    .and_then(|v| v.as_amphora_id())
    .expect("amphora id");
  let row = plane.amphora(amphora_id);
  let compute_id = row.compute_id.expect("compute id");

  let delete = flows(&plane, DriverMode::Plain)
    .delete_amphora_flow()
    .expect("build");
  let mut store = DataStore::seeded([(FlowKey::Amphora, FlowValue::Amphora(row))]);
  delete.run(&mut store).await.expect("delete");

  assert_eq!(plane.amphora(amphora_id).status, AmphoraStatus::Deleted);
  assert!(!plane.compute_exists(compute_id));
  assert!(plane
    .actions()
    .contains(&format!("health-disabled {amphora_id}")));
}

#[tokio::test]
async fn failover_replaces_the_amphora_and_restores_service() {
  init_tracing();
  let plane = ControlPlane::new();
  let lb_id = Uuid::new_v4();
  let original_id = Uuid::new_v4();
  let original_compute = Uuid::new_v4();
  plane.insert_compute(original_compute);
  plane.insert_amphora(Amphora {
    id: original_id,
    compute_id: Some(original_compute),
    status: AmphoraStatus::Allocated,
    role: Some(Role::Standalone),
    loadbalancer_id: Some(lb_id),
    lb_network_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 60))),
    cert_expiration: None,
    cert_busy: false,
  });
  plane.set_polls_before_active(1);

  let flow = flows(&plane, DriverMode::CertBundled)
    .failover_flow()
    .expect("build");
  let mut store = DataStore::seeded([
    (
      FlowKey::Amphora,
      FlowValue::Amphora(plane.amphora(original_id)),
    ),
    (FlowKey::LoadbalancerId, FlowValue::LoadbalancerId(lb_id)),
  ]);
  flow.run(&mut store).await.expect("failover");

  // The failed amphora is gone: row deleted, instance removed.
  assert_eq!(plane.amphora(original_id).status, AmphoraStatus::Deleted);
  assert!(!plane.compute_exists(original_compute));

  // The replacement serves the same load balancer.
  let replacement_id = store
    .get(FlowKey::AmphoraId)
    .and_then(|v| v.as_amphora_id())
    .expect("replacement id");
  assert_ne!(replacement_id, original_id);
  let replacement = plane.amphora(replacement_id);
  assert_eq!(replacement.status, AmphoraStatus::Allocated);
  assert_eq!(replacement.loadbalancer_id, Some(lb_id));
  assert!(plane.compute_exists(replacement.compute_id.expect("compute")));

  let actions = plane.actions();
  assert!(actions.contains(&format!("finalized {replacement_id}")));
  assert!(actions.contains(&format!("ports-plugged {replacement_id} 1")));
  assert!(actions.iter().any(|a| a == "listeners-started"));
}
