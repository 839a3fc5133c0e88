use bridge_core::{
    parse_deployment, parse_events, parse_remediations, parse_service_states, BridgeConfig,
    CacheEvent, DashboardCache, SnapshotError,
};
use bridge_trace::{TraceStatus, LABEL_STARTED};
use bridge_types::SequenceState;

const DELIVERY_PAGE: &str = r#"{"events": [
    {"id": "r", "type": "sh.keptn.event.dev.delivery.triggered", "time": "2021-05-10T09:00:00Z",
     "shkeptncontext": "X", "data": {"project": "sockshop", "service": "carts", "stage": "dev"}},
    {"id": "d", "type": "sh.keptn.event.deployment.triggered", "time": "2021-05-10T09:01:00Z",
     "shkeptncontext": "X", "data": {"project": "sockshop", "service": "carts", "stage": "dev",
       "configurationChange": {"values": {"image": "docker.io/keptnexamples/carts:0.12.3"}}}},
    {"id": "d-s", "type": "sh.keptn.event.deployment.started", "time": "2021-05-10T09:02:00Z",
     "shkeptncontext": "X", "triggeredid": "d", "data": {"service": "carts", "stage": "dev"}}
]}"#;

const DELIVERY_FINISHED: &str = r#"[
    {"id": "d-f", "type": "sh.keptn.event.deployment.finished", "time": "2021-05-10T09:05:00Z",
     "shkeptncontext": "X", "triggeredid": "d",
     "data": {"service": "carts", "stage": "dev", "result": "pass", "status": "succeeded"}}
]"#;

const REMEDIATION_PAGE: &str = r#"[
    {"id": "rem", "type": "sh.keptn.event.production.remediation.triggered",
     "time": "2021-05-10T10:00:00Z",
     "shkeptncontext": "R", "data": {"service": "carts", "stage": "production",
       "problem": {"ProblemTitle": "Response time degradation", "State": "OPEN"}}},
    {"id": "a1", "type": "sh.keptn.event.action.triggered", "time": "2021-05-10T10:01:00Z",
     "shkeptncontext": "R", "data": {"service": "carts", "stage": "production",
       "action": {"name": "Scale up", "action": "scaling"}}}
]"#;

const DEPLOYMENT: &str = r#"{
    "keptnContext": "X",
    "service": "carts",
    "state": "started",
    "stages": [
        {"name": "dev", "subSequences": [
            {"id": "s1", "name": "delivery", "state": "finished", "result": "pass"}
        ]},
        {"name": "production", "subSequences": [
            {"id": "s2", "name": "delivery", "state": "waiting", "hasPendingApproval": true}
        ]}
    ]
}"#;

const SERVICES: &str = r#"{"serviceStates": [
    {"name": "orders", "deploymentInformation": []},
    {"name": "carts", "deploymentInformation": [
        {"keptnContext": "X", "name": "carts", "image": "docker.io/keptnexamples/carts",
         "version": "0.12.3",
         "stages": [{"name": "dev", "time": "2021-05-10T09:05:00Z"}]}
    ]}
]}"#;

#[test]
fn test_trace_status_follows_incremental_pages() {
    let mut cache = DashboardCache::new(&BridgeConfig::default());
    let report = cache.ingest_events(parse_events(DELIVERY_PAGE).unwrap());
    assert_eq!(report.roots_created, 1);
    assert_eq!(report.attached, 2);

    let root = cache.root("X").unwrap();
    assert_eq!(root.status(), TraceStatus::Active);
    assert_eq!(root.status_label(), LABEL_STARTED);
    assert_eq!(root.deployment_image(), Some("docker.io/keptnexamples/carts:0.12.3"));

    cache.ingest_events(parse_events(DELIVERY_FINISHED).unwrap());
    let root = cache.root("X").unwrap();
    assert!(root.is_finished());
    assert_eq!(root.status(), TraceStatus::Succeeded);
    assert!(root.is_successful(Some("dev")));

    let again = cache.ingest_events(parse_events(DELIVERY_PAGE).unwrap());
    assert_eq!(again.duplicates, 3);
    assert_eq!(cache.forest().len(), 1);
}

#[test]
fn test_deployment_snapshots_are_idempotent() {
    let mut cache = DashboardCache::new(&BridgeConfig::default());
    let mut rx = cache.bus().subscribe();
    cache.apply_deployment(parse_deployment(DEPLOYMENT).unwrap());
    let once = cache.deployment("X").cloned().unwrap();
    cache.apply_deployment(parse_deployment(DEPLOYMENT).unwrap());
    assert_eq!(cache.deployment("X"), Some(&once));

    assert!(once.has_pending_approval());
    assert!(!once.is_finished());
    assert!(cache.remove_approval("X", "production"));
    assert!(!cache.deployment("X").unwrap().has_pending_approval());

    let events: Vec<CacheEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[2], CacheEvent::ApprovalRemoved { .. }));
}

#[test]
fn test_service_reconcile_keeps_attached_deployments() {
    let mut cache = DashboardCache::new(&BridgeConfig::default());
    cache.apply_deployment(parse_deployment(DEPLOYMENT).unwrap());
    cache.apply_service_states(parse_service_states(SERVICES).unwrap());
    cache.attach_deployments();

    let names: Vec<&str> = cache.services().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["carts", "orders"]);

    cache.apply_service_states(parse_service_states(SERVICES).unwrap());
    let carts = cache.service("carts").unwrap();
    assert_eq!(carts.latest_image(), "docker.io/keptnexamples/carts:0.12.3");
    let attached = carts.information("X").unwrap().deployment.as_ref().unwrap();
    assert_eq!(attached.state, SequenceState::Started);
}

#[test]
fn test_open_remediations_reach_the_deployment_stage() {
    let mut cache = DashboardCache::new(&BridgeConfig::default());
    cache.ingest_events(parse_events(REMEDIATION_PAGE).unwrap());
    cache.apply_deployment(parse_deployment(DEPLOYMENT).unwrap());

    assert!(cache.sync_remediations("X"));
    let deployment = cache.deployment("X").unwrap();
    let production = deployment.stage("production").unwrap();
    assert_eq!(production.open_remediations.len(), 1);
    assert_eq!(
        production.open_remediations[0].problem_title.as_deref(),
        Some("Response time degradation")
    );
    assert!(deployment.stage("dev").unwrap().open_remediations.is_empty());

    let cleared = parse_remediations(r#"{"stages": []}"#).unwrap();
    assert!(cache.apply_remediations("X", &cleared));
    assert!(cache
        .deployment("X")
        .unwrap()
        .stage("production")
        .unwrap()
        .open_remediations
        .is_empty());
}

#[test]
fn test_malformed_snapshots_are_rejected() {
    match parse_events("42") {
        Err(SnapshotError::InvalidShape(_)) => (),
        _ => panic!("Expected InvalidShape error"),
    }
    assert!(matches!(parse_deployment("{"), Err(SnapshotError::Parse(_))));
}
