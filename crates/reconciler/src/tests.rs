//! Orchestrator tests against a recording in-process driver

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use l2net_core::{
    BindingStore, DeviceOutcome, DeviceState, ReconcileError, Result, SwitchDriver, VlanRange,
};
use l2net_event_bus::{EventBus, EventListener};
use l2net_segmentation::SegmentationAllocator;
use l2net_shared_types::{
    DeviceOperation, DeviceOperationKind, NetworkRequest, NetworkStatus, NetworkUpdate,
    SubnetRequest, SubnetUpdate, SystemEvent, TransportKind, VlanId,
};
use l2net_store::{Database, DbBindingStore, DbResourceStore};

use crate::{DriverInvoker, InvokePolicy, LogicalOperation, Orchestrator, OrchestratorSettings};

#[derive(Debug, Clone)]
enum Step {
    Pass,
    Reject,
    Unreachable,
    Hang,
    SlowReject(Duration),
}

#[derive(Default)]
struct RecordingDriver {
    calls: Mutex<Vec<DeviceOperation>>,
    vlans: Mutex<BTreeSet<VlanId>>,
    trunks: Mutex<BTreeSet<(String, VlanId)>>,
    script: Mutex<HashMap<DeviceOperationKind, VecDeque<Step>>>,
}

impl RecordingDriver {
    fn script(&self, kind: DeviceOperationKind, steps: Vec<Step>) {
        self.script
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .extend(steps);
    }

    fn calls(&self) -> Vec<DeviceOperation> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_of(&self, kind: DeviceOperationKind) -> usize {
        self.calls().iter().filter(|op| op.kind() == kind).count()
    }

    fn vlans(&self) -> BTreeSet<VlanId> {
        self.vlans.lock().unwrap().clone()
    }

    fn set_vlans(&self, ids: &[u16]) {
        *self.vlans.lock().unwrap() = ids.iter().map(|id| vlan(*id)).collect();
    }

    async fn apply(&self, operation: DeviceOperation) -> Result<DeviceOutcome> {
        self.calls.lock().unwrap().push(operation.clone());

        let step = self
            .script
            .lock()
            .unwrap()
            .get_mut(&operation.kind())
            .and_then(|steps| steps.pop_front())
            .unwrap_or(Step::Pass);

        let rejected = || ReconcileError::DeviceRejected {
            device: "recording".to_string(),
            operation: operation.to_string(),
            reply: "% Invalid input".to_string(),
        };
        match step {
            Step::Pass => {}
            Step::Reject => return Err(rejected()),
            Step::Unreachable => {
                return Err(ReconcileError::DeviceUnreachable {
                    device: "recording".to_string(),
                    message: "connection refused".to_string(),
                })
            }
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return Err(rejected());
            }
            Step::SlowReject(delay) => {
                tokio::time::sleep(delay).await;
                return Err(rejected());
            }
        }

        let changed = match &operation {
            DeviceOperation::CreateVlan { vlan_id, .. } => {
                self.vlans.lock().unwrap().insert(*vlan_id)
            }
            DeviceOperation::DeleteVlan { vlan_id } => self.vlans.lock().unwrap().remove(vlan_id),
            DeviceOperation::EnableTrunk { port, vlan_id } => {
                self.trunks.lock().unwrap().insert((port.clone(), *vlan_id))
            }
            DeviceOperation::DisableTrunk { port, vlan_id } => {
                self.trunks.lock().unwrap().remove(&(port.clone(), *vlan_id))
            }
        };

        Ok(if changed {
            DeviceOutcome::Applied
        } else {
            DeviceOutcome::AlreadyInState
        })
    }
}

#[async_trait]
impl SwitchDriver for RecordingDriver {
    fn transport(&self) -> TransportKind {
        TransportKind::RawSocket
    }

    fn device(&self) -> &str {
        "recording"
    }

    async fn create_vlan(&self, vlan_id: VlanId, vlan_name: &str) -> Result<DeviceOutcome> {
        self.apply(DeviceOperation::CreateVlan {
            vlan_id,
            vlan_name: vlan_name.to_string(),
        })
        .await
    }

    async fn delete_vlan(&self, vlan_id: VlanId) -> Result<DeviceOutcome> {
        self.apply(DeviceOperation::DeleteVlan { vlan_id }).await
    }

    async fn enable_trunk(&self, port: &str, vlan_id: VlanId) -> Result<DeviceOutcome> {
        self.apply(DeviceOperation::EnableTrunk {
            port: port.to_string(),
            vlan_id,
        })
        .await
    }

    async fn disable_trunk(&self, port: &str, vlan_id: VlanId) -> Result<DeviceOutcome> {
        self.apply(DeviceOperation::DisableTrunk {
            port: port.to_string(),
            vlan_id,
        })
        .await
    }

    async fn query_state(&self) -> Result<DeviceState> {
        Ok(DeviceState {
            vlan_ids: self.vlans(),
        })
    }
}

#[derive(Default, Clone)]
struct CollectingListener {
    events: Arc<Mutex<Vec<SystemEvent>>>,
}

#[async_trait]
impl EventListener for CollectingListener {
    async fn on_event(&self, event: &SystemEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct Harness {
    db: Arc<Database>,
    driver: Arc<RecordingDriver>,
    bindings: Arc<DbBindingStore>,
    orchestrator: Orchestrator,
    events: Arc<Mutex<Vec<SystemEvent>>>,
}

impl Harness {
    async fn new(min: u16, max: u16, trunk_ports: &[&str]) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let db = Arc::new(Database::in_memory());
        let range = VlanRange::new(min, max).unwrap();
        let allocator = SegmentationAllocator::new(db.clone(), range);
        let bindings = Arc::new(DbBindingStore::new(db.clone()));
        let resources = Arc::new(DbResourceStore::new(db.clone()));
        let driver = Arc::new(RecordingDriver::default());
        let invoker = DriverInvoker::new(
            driver.clone(),
            InvokePolicy {
                timeout: Duration::from_millis(200),
                max_retries: 2,
                backoff: Duration::from_millis(1),
            },
        );

        let listener = CollectingListener::default();
        let events = listener.events.clone();
        let bus = EventBus::new();
        bus.register_listener("collect", listener).await.unwrap();

        let settings = OrchestratorSettings {
            trunk_ports: trunk_ports.iter().map(|p| p.to_string()).collect(),
            ..OrchestratorSettings::default()
        };
        let orchestrator = Orchestrator::new(
            allocator,
            bindings.clone(),
            resources,
            invoker,
            settings,
            bus,
        );

        Self {
            db,
            driver,
            bindings,
            orchestrator,
            events,
        }
    }

    fn events(&self) -> Vec<SystemEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Assert the model carries nothing for any network
    async fn assert_model_empty(&self) {
        assert!(self.bindings.list_vlan_bindings().await.unwrap().is_empty());
        assert!(self.bindings.list_all_port_bindings().await.unwrap().is_empty());
        assert!(self
            .orchestrator
            .list_reservations(None)
            .await
            .unwrap()
            .is_empty());
    }
}

fn vlan(id: u16) -> VlanId {
    VlanId::new(id).unwrap()
}

fn network(id: &str) -> NetworkRequest {
    NetworkRequest::new(id, format!("{}-name", id))
}

fn subnet(id: &str, network_id: &str, cidr: &str, gateway: &str) -> SubnetRequest {
    SubnetRequest {
        id: id.to_string(),
        network_id: network_id.to_string(),
        ip_version: 4,
        cidr: cidr.parse().unwrap(),
        gateway_ip: Some(gateway.parse().unwrap()),
        allocation_pools: Vec::new(),
    }
}

#[tokio::test]
async fn test_create_then_get() {
    let h = Harness::new(1, 4094, &[]).await;

    let view = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    assert_eq!(view.vlan_id, vlan(1));
    assert_eq!(view.vlan_name, "q-net-a");
    assert_eq!(view.network.status, NetworkStatus::Active);

    assert_eq!(
        h.driver.calls(),
        vec![DeviceOperation::CreateVlan {
            vlan_id: vlan(1),
            vlan_name: "q-net-a".to_string(),
        }]
    );

    let fetched = h.orchestrator.get_network("net-a").await.unwrap();
    assert_eq!(fetched, view);

    let reservations = h.orchestrator.list_reservations(Some("t1")).await.unwrap();
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].network_id, "net-a");

    assert_eq!(
        h.events(),
        vec![SystemEvent::NetworkCreated {
            network_id: "net-a".to_string(),
            vlan_id: vlan(1),
        }]
    );
}

#[tokio::test]
async fn test_rejected_create_leaves_no_trace() {
    let h = Harness::new(1, 4094, &[]).await;
    h.driver
        .script(DeviceOperationKind::CreateVlan, vec![Step::Reject]);

    let err = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::DeviceRejected { .. }));

    // Rejections are not retried and nothing reached the device
    assert_eq!(h.driver.calls_of(DeviceOperationKind::CreateVlan), 1);
    assert_eq!(h.driver.calls_of(DeviceOperationKind::DeleteVlan), 0);

    h.assert_model_empty().await;
    assert!(matches!(
        h.orchestrator.get_network("net-a").await,
        Err(ReconcileError::NetworkNotFound { .. })
    ));
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, SystemEvent::CompensationApplied { operation, .. } if operation == "create_network")));
}

#[tokio::test]
async fn test_timeout_is_retried_then_compensated() {
    let h = Harness::new(1, 4094, &[]).await;
    h.driver.script(
        DeviceOperationKind::CreateVlan,
        vec![Step::Hang, Step::Hang, Step::Hang],
    );

    let err = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::DeviceTimeout { .. }));
    assert_eq!(h.driver.calls_of(DeviceOperationKind::CreateVlan), 3);

    // The device may have applied a timed out create, so it is undone
    assert_eq!(h.driver.calls_of(DeviceOperationKind::DeleteVlan), 1);
    h.assert_model_empty().await;
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let h = Harness::new(1, 4094, &[]).await;
    h.driver
        .script(DeviceOperationKind::CreateVlan, vec![Step::Unreachable]);

    let view = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    assert_eq!(view.vlan_id, vlan(1));
    assert_eq!(h.driver.calls_of(DeviceOperationKind::CreateVlan), 2);
    assert!(h.driver.vlans().contains(&vlan(1)));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let h = Harness::new(1, 4094, &[]).await;
    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();

    let first = h.orchestrator.delete_network("t1", "net-a").await.unwrap();
    assert_eq!(first.vlan_id, Some(vlan(1)));
    assert!(first.device_clean());
    assert!(h.driver.vlans().is_empty());

    let calls_before = h.driver.calls().len();
    let second = h.orchestrator.delete_network("t1", "net-a").await.unwrap();
    assert!(second.already_deleted());
    assert_eq!(h.driver.calls().len(), calls_before);

    h.assert_model_empty().await;
}

#[tokio::test]
async fn test_deleted_vlan_is_reused() {
    let h = Harness::new(1, 4094, &[]).await;

    let a = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    h.orchestrator.delete_network("t1", "net-a").await.unwrap();
    let b = h
        .orchestrator
        .create_network("t1", network("net-b"))
        .await
        .unwrap();

    assert_eq!(a.vlan_id, b.vlan_id);
    assert_eq!(b.vlan_name, "q-net-b");
}

#[tokio::test]
async fn test_delete_detaches_trunks_before_vlan() {
    let h = Harness::new(1, 4094, &["Gi1/0/1", "Gi1/0/2"]).await;

    let view = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    assert_eq!(view.ports, vec!["Gi1/0/1", "Gi1/0/2"]);

    let before = h.driver.calls().len();
    let outcome = h.orchestrator.delete_network("t1", "net-a").await.unwrap();
    assert_eq!(outcome.detached_ports, vec!["Gi1/0/1", "Gi1/0/2"]);

    let delete_calls = h.driver.calls()[before..].to_vec();
    assert_eq!(
        delete_calls,
        vec![
            DeviceOperation::DisableTrunk {
                port: "Gi1/0/1".to_string(),
                vlan_id: vlan(1),
            },
            DeviceOperation::DisableTrunk {
                port: "Gi1/0/2".to_string(),
                vlan_id: vlan(1),
            },
            DeviceOperation::DeleteVlan { vlan_id: vlan(1) },
        ]
    );
    h.assert_model_empty().await;
}

#[tokio::test]
async fn test_exhausted_range() {
    let h = Harness::new(10, 11, &[]).await;

    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    h.orchestrator
        .create_network("t1", network("net-b"))
        .await
        .unwrap();

    let err = h
        .orchestrator
        .create_network("t1", network("net-c"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::ExhaustedRange { .. }));
    assert_eq!(h.driver.calls().len(), 2);
    assert_eq!(h.bindings.list_vlan_bindings().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_trunk_failure_is_compensated() {
    let h = Harness::new(1, 4094, &["Gi1/0/1", "Gi1/0/2"]).await;
    h.driver.script(
        DeviceOperationKind::EnableTrunk,
        vec![Step::Pass, Step::Reject],
    );

    let err = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::DeviceRejected { .. }));

    let calls = h.driver.calls();
    assert_eq!(
        calls[3..].to_vec(),
        vec![
            DeviceOperation::DisableTrunk {
                port: "Gi1/0/1".to_string(),
                vlan_id: vlan(1),
            },
            DeviceOperation::DeleteVlan { vlan_id: vlan(1) },
        ]
    );
    assert!(h.driver.vlans().is_empty());
    h.assert_model_empty().await;
}

#[tokio::test]
async fn test_delete_reports_device_failure() {
    let h = Harness::new(1, 4094, &["Gi1/0/1"]).await;
    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    h.driver
        .script(DeviceOperationKind::DisableTrunk, vec![Step::Reject]);

    let outcome = h.orchestrator.delete_network("t1", "net-a").await.unwrap();
    assert_eq!(outcome.vlan_id, Some(vlan(1)));
    assert_eq!(outcome.device_errors.len(), 1);

    // The VLAN stays on the device while a trunk still carries it
    assert_eq!(h.driver.calls_of(DeviceOperationKind::DeleteVlan), 0);
    h.assert_model_empty().await;
    assert!(h.events().iter().any(|e| matches!(
        e,
        SystemEvent::DeviceCleanupFailed { network_id, .. } if network_id == "net-a"
    )));
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_vlans() {
    let h = Harness::new(1, 4094, &[]).await;

    let tasks = (0..20).map(|i| {
        let orchestrator = h.orchestrator.clone();
        async move {
            orchestrator
                .create_network("t1", network(&format!("net-{}", i)))
                .await
        }
    });
    let views = futures::future::join_all(tasks).await;

    let ids: HashSet<VlanId> = views.into_iter().map(|v| v.unwrap().vlan_id).collect();
    assert_eq!(ids.len(), 20);
    assert!(ids.iter().all(|id| id.get() <= 20));
    assert_eq!(h.driver.vlans().len(), 20);
}

#[tokio::test]
async fn test_duplicate_create_rejected() {
    let h = Harness::new(1, 4094, &[]).await;
    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();

    let err = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::DuplicateBinding { .. }));
    assert_eq!(h.driver.calls_of(DeviceOperationKind::CreateVlan), 1);
    assert_eq!(h.bindings.list_vlan_bindings().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancelled_create_still_compensates() {
    let h = Harness::new(1, 4094, &[]).await;
    h.driver.script(
        DeviceOperationKind::CreateVlan,
        vec![Step::SlowReject(Duration::from_millis(100))],
    );

    let cancelled = tokio::time::timeout(
        Duration::from_millis(10),
        h.orchestrator.create_network("t1", network("net-a")),
    )
    .await;
    assert!(cancelled.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    h.assert_model_empty().await;
    assert!(h
        .events()
        .iter()
        .any(|e| matches!(e, SystemEvent::CompensationApplied { .. })));
}

#[tokio::test]
async fn test_interrupted_create_resumes() {
    let h = Harness::new(1, 4094, &[]).await;

    // A previous run reserved, bound and pushed but never wrote the record
    let allocator = SegmentationAllocator::new(h.db.clone(), h.orchestrator.vlan_range());
    let id = allocator.reserve("t1", "net-a", "net-a-name").await.unwrap();
    h.bindings
        .add_vlan_binding(id, "q-net-a", "net-a")
        .await
        .unwrap();
    h.driver.set_vlans(&[id.get()]);

    let view = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    assert_eq!(view.vlan_id, id);
    assert_eq!(h.orchestrator.list_reservations(None).await.unwrap().len(), 1);
    assert_eq!(h.driver.vlans().len(), 1);
}

#[tokio::test]
async fn test_create_keeps_other_tenants_reservation() {
    let h = Harness::new(1, 4094, &[]).await;

    let allocator = SegmentationAllocator::new(h.db.clone(), h.orchestrator.vlan_range());
    let id = allocator.reserve("t2", "net-a", "net-a").await.unwrap();

    let err = h
        .orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::DuplicateBinding { .. }));
    assert!(h.driver.calls().is_empty());

    let err = h.orchestrator.delete_network("t1", "net-a").await.unwrap_err();
    assert!(matches!(err, ReconcileError::NetworkNotFound { .. }));

    let reservations = h.orchestrator.list_reservations(None).await.unwrap();
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].tenant_id, "t2");

    // The owner resumes on the same id and deletes cleanly
    let view = h
        .orchestrator
        .create_network("t2", network("net-a"))
        .await
        .unwrap();
    assert_eq!(view.vlan_id, id);
    let outcome = h.orchestrator.delete_network("t2", "net-a").await.unwrap();
    assert_eq!(outcome.vlan_id, Some(id));
    h.assert_model_empty().await;
    assert!(h.driver.vlans().is_empty());
}

#[tokio::test]
async fn test_delete_interrupted_create_by_other_tenant() {
    let h = Harness::new(1, 4094, &[]).await;

    // Reserved, bound and pushed by t1, but no record was written
    let allocator = SegmentationAllocator::new(h.db.clone(), h.orchestrator.vlan_range());
    let id = allocator.reserve("t1", "net-a", "net-a").await.unwrap();
    h.bindings
        .add_vlan_binding(id, "q-net-a", "net-a")
        .await
        .unwrap();
    h.driver.set_vlans(&[id.get()]);

    let err = h.orchestrator.delete_network("t9", "net-a").await.unwrap_err();
    assert!(matches!(err, ReconcileError::NetworkNotFound { .. }));
    assert!(h.driver.calls().is_empty());
    assert_eq!(h.driver.vlans().len(), 1);
    assert_eq!(h.bindings.list_vlan_bindings().await.unwrap().len(), 1);
    assert_eq!(h.orchestrator.list_reservations(None).await.unwrap().len(), 1);

    let outcome = h.orchestrator.delete_network("t1", "net-a").await.unwrap();
    assert_eq!(outcome.vlan_id, Some(id));
    assert!(outcome.device_clean());
    h.assert_model_empty().await;
    assert!(h.driver.vlans().is_empty());
}

#[tokio::test]
async fn test_full_range_rejects_create() {
    let h = Harness::new(1, 4094, &[]).await;

    let allocator = SegmentationAllocator::new(h.db.clone(), h.orchestrator.vlan_range());
    for i in 1..=4094u16 {
        let network = format!("net-{}", i);
        allocator.reserve("t1", &network, &network).await.unwrap();
    }
    let before = h.orchestrator.list_reservations(None).await.unwrap();

    let err = h
        .orchestrator
        .create_network("t2", network("net-x"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::ExhaustedRange { .. }));

    assert!(h.driver.calls().is_empty());
    assert_eq!(h.orchestrator.list_reservations(None).await.unwrap(), before);
    assert!(h.bindings.list_vlan_bindings().await.unwrap().is_empty());
    assert!(h
        .events()
        .iter()
        .all(|e| !matches!(e, SystemEvent::CompensationApplied { .. })));
}

#[tokio::test]
async fn test_update_network() {
    let h = Harness::new(1, 4094, &[]).await;
    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();

    let view = h
        .orchestrator
        .update_network(
            "net-a",
            NetworkUpdate {
                name: Some("renamed".to_string()),
                admin_state_up: Some(false),
            },
        )
        .await
        .unwrap();
    assert_eq!(view.network.name, "renamed");
    assert_eq!(view.network.status, NetworkStatus::Down);
    // The VLAN name keeps following the network id
    assert_eq!(view.vlan_name, "q-net-a");

    let err = h
        .orchestrator
        .update_network(
            "net-a",
            NetworkUpdate {
                name: Some(" ".to_string()),
                admin_state_up: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidRequest { .. }));

    assert!(matches!(
        h.orchestrator
            .update_network("missing", NetworkUpdate::default())
            .await,
        Err(ReconcileError::NetworkNotFound { .. })
    ));
}

#[tokio::test]
async fn test_subnet_lifecycle() {
    let h = Harness::new(1, 4094, &[]).await;
    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    let device_calls = h.driver.calls().len();

    let view = h
        .orchestrator
        .create_subnet("t1", subnet("sub-1", "net-a", "10.0.0.0/24", "10.0.0.1"))
        .await
        .unwrap();
    assert_eq!(view.vlan_id, vlan(1));

    let network = h.orchestrator.get_network("net-a").await.unwrap();
    assert_eq!(network.network.subnets, vec!["sub-1"]);

    let updated = h
        .orchestrator
        .update_subnet(
            "sub-1",
            SubnetUpdate {
                gateway_ip: Some("10.0.0.254".parse().unwrap()),
                ..SubnetUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.subnet.gateway_ip, Some("10.0.0.254".parse().unwrap()));

    let bad = h
        .orchestrator
        .update_subnet(
            "sub-1",
            SubnetUpdate {
                gateway_ip: Some("192.168.1.1".parse().unwrap()),
                ..SubnetUpdate::default()
            },
        )
        .await;
    assert!(matches!(bad, Err(ReconcileError::InvalidRequest { .. })));
    assert_eq!(
        h.orchestrator.get_subnet("sub-1").await.unwrap(),
        updated
    );

    assert_eq!(
        h.orchestrator.list_subnets(Some("net-a")).await.unwrap().len(),
        1
    );

    h.orchestrator.delete_subnet("sub-1").await.unwrap();
    assert!(matches!(
        h.orchestrator.get_subnet("sub-1").await,
        Err(ReconcileError::SubnetNotFound { .. })
    ));
    assert!(matches!(
        h.orchestrator.delete_subnet("sub-1").await,
        Err(ReconcileError::SubnetNotFound { .. })
    ));

    // Subnets are model-only
    assert_eq!(h.driver.calls().len(), device_calls);
}

#[tokio::test]
async fn test_subnet_requires_owned_network() {
    let h = Harness::new(1, 4094, &[]).await;
    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();

    assert!(matches!(
        h.orchestrator
            .create_subnet("t1", subnet("sub-1", "missing", "10.0.0.0/24", "10.0.0.1"))
            .await,
        Err(ReconcileError::NetworkNotFound { .. })
    ));
    assert!(matches!(
        h.orchestrator
            .create_subnet("t2", subnet("sub-1", "net-a", "10.0.0.0/24", "10.0.0.1"))
            .await,
        Err(ReconcileError::NetworkNotFound { .. })
    ));

    h.orchestrator
        .create_subnet("t1", subnet("sub-1", "net-a", "10.0.0.0/24", "10.0.0.1"))
        .await
        .unwrap();
    assert!(matches!(
        h.orchestrator
            .create_subnet("t1", subnet("sub-1", "net-a", "10.0.1.0/24", "10.0.1.1"))
            .await,
        Err(ReconcileError::InvalidRequest { .. })
    ));

    // Deleting the network drops its subnets
    h.orchestrator.delete_network("t1", "net-a").await.unwrap();
    assert!(h.orchestrator.list_subnets(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_attach_and_detach_port() {
    let h = Harness::new(1, 4094, &[]).await;
    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();

    let binding = h.orchestrator.attach_port("net-a", "Gi1/0/9").await.unwrap();
    assert_eq!(binding.vlan_id, vlan(1));
    h.orchestrator.attach_port("net-a", "Gi1/0/9").await.unwrap();
    assert_eq!(h.driver.calls_of(DeviceOperationKind::EnableTrunk), 1);

    let view = h.orchestrator.get_network("net-a").await.unwrap();
    assert_eq!(view.ports, vec!["Gi1/0/9"]);

    h.orchestrator.detach_port("net-a", "Gi1/0/9").await.unwrap();
    assert_eq!(h.driver.calls_of(DeviceOperationKind::DisableTrunk), 1);
    assert!(matches!(
        h.orchestrator.detach_port("net-a", "Gi1/0/9").await,
        Err(ReconcileError::PortBindingNotFound { .. })
    ));
    assert!(matches!(
        h.orchestrator.attach_port("missing", "Gi1/0/9").await,
        Err(ReconcileError::BindingNotFound { .. })
    ));

    let kinds: Vec<&str> = h
        .events()
        .iter()
        .map(|e| match e {
            SystemEvent::PortAttached { .. } => "attached",
            SystemEvent::PortDetached { .. } => "detached",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["other", "attached", "detached"]);
}

#[tokio::test]
async fn test_failed_attach_leaves_no_binding() {
    let h = Harness::new(1, 4094, &[]).await;
    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    h.driver
        .script(DeviceOperationKind::EnableTrunk, vec![Step::Reject]);

    assert!(h.orchestrator.attach_port("net-a", "Gi1/0/9").await.is_err());
    assert!(h
        .bindings
        .list_all_port_bindings()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_audit() {
    let h = Harness::new(1, 100, &[]).await;
    h.orchestrator
        .create_network("t1", network("net-a"))
        .await
        .unwrap();
    h.orchestrator
        .create_network("t1", network("net-b"))
        .await
        .unwrap();
    assert!(h.orchestrator.audit().await.unwrap().in_sync());

    // VLAN 1 vanished from the device, 5 appeared, 4000 is outside the range
    h.driver.set_vlans(&[2, 5, 4000]);

    let report = h.orchestrator.audit().await.unwrap();
    assert!(!report.in_sync());
    assert_eq!(report.device, "recording");
    assert_eq!(report.missing_on_device.len(), 1);
    assert_eq!(report.missing_on_device[0].network_id, "net-a");
    assert_eq!(report.unknown_on_device, vec![vlan(5)]);
}

#[tokio::test]
async fn test_dispatch_by_name() {
    let h = Harness::new(1, 4094, &[]).await;

    let op: LogicalOperation = "create_network".parse().unwrap();
    let created = h
        .orchestrator
        .dispatch(
            op,
            json!({"tenant_id": "t1", "network": {"id": "net-a", "name": "blue"}}),
        )
        .await
        .unwrap();
    assert_eq!(created["id"], "net-a");
    assert_eq!(created["vlan_id"], 1);
    assert_eq!(created["status"], "ACTIVE");

    let listed = h
        .orchestrator
        .dispatch(LogicalOperation::ListNetworks, serde_json::Value::Null)
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let bad = h
        .orchestrator
        .dispatch(LogicalOperation::DeleteNetwork, json!({"network_id": "net-a"}))
        .await;
    assert!(matches!(bad, Err(ReconcileError::InvalidRequest { .. })));

    let deleted = h
        .orchestrator
        .dispatch(
            LogicalOperation::DeleteNetwork,
            json!({"tenant_id": "t1", "network_id": "net-a"}),
        )
        .await
        .unwrap();
    assert_eq!(deleted["vlan_id"], 1);

    assert!("bogus".parse::<LogicalOperation>().is_err());
    assert!(!LogicalOperation::Audit.is_mutating());
    assert!(LogicalOperation::AttachPort.is_mutating());
}
