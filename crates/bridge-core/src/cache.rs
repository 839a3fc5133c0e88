use std::collections::HashMap;

use bridge_deployments::{Deployment, RemediationUpdate, ServiceState};
use bridge_observability::{emit_event, ObservabilityEvent, ProcessKind};
use bridge_trace::{AppendReport, Forest, Root};
use bridge_types::EventRecord;
use tracing::Level;

use crate::config::BridgeConfig;
use crate::event_bus::{CacheEvent, EventBus};

/// Client-side projection of everything fetched so far. Every mutation goes
/// through one of the `apply_*`/`ingest_*` entry points, and each publishes a
/// [`CacheEvent`] once it has been applied.
pub struct DashboardCache {
    process: ProcessKind,
    forest: Forest,
    deployments: HashMap<String, Deployment>,
    services: Vec<ServiceState>,
    bus: EventBus,
}

impl DashboardCache {
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_bus(EventBus::with_capacity(config.event_buffer))
    }

    pub fn with_bus(bus: EventBus) -> Self {
        Self {
            process: ProcessKind::Dashboard,
            forest: Forest::default(),
            deployments: HashMap::new(),
            services: Vec::new(),
            bus,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn root(&self, keptn_context: &str) -> Option<&Root> {
        self.forest.root(keptn_context)
    }

    pub fn deployment(&self, keptn_context: &str) -> Option<&Deployment> {
        self.deployments.get(keptn_context)
    }

    pub fn services(&self) -> &[ServiceState] {
        &self.services
    }

    pub fn service(&self, name: &str) -> Option<&ServiceState> {
        self.services.iter().find(|service| service.name == name)
    }

    pub fn ingest_events(&mut self, events: Vec<EventRecord>) -> AppendReport {
        let report = self.forest.append(events);
        if report.orphans > 0 {
            emit_event(
                Level::WARN,
                self.process,
                ObservabilityEvent {
                    event: "events.orphaned",
                    component: "trace",
                    count: Some(report.orphans),
                    detail: Some("triggeredid does not resolve in its context"),
                    ..Default::default()
                },
            );
        }
        self.bus.publish(CacheEvent::EventsIngested {
            roots_created: report.roots_created,
            attached: report.attached,
            orphans: report.orphans,
        });
        report
    }

    /// Creates the cached deployment on first sight, merges afterwards.
    pub fn apply_deployment(&mut self, incoming: Deployment) {
        let keptn_context = incoming.keptn_context.clone();
        let event = match self.deployments.get_mut(&keptn_context) {
            Some(cached) => {
                cached.update(incoming);
                CacheEvent::DeploymentUpdated {
                    keptn_context: keptn_context.clone(),
                }
            }
            None => {
                self.deployments.insert(keptn_context.clone(), incoming);
                CacheEvent::DeploymentCreated {
                    keptn_context: keptn_context.clone(),
                }
            }
        };
        self.refresh_attached(&keptn_context);
        emit_event(
            Level::DEBUG,
            self.process,
            ObservabilityEvent {
                event: "deployment.reconciled",
                component: "deployments",
                keptn_context: Some(&keptn_context),
                status: self
                    .deployments
                    .get(&keptn_context)
                    .map(|deployment| deployment.state.as_str()),
                ..Default::default()
            },
        );
        self.bus.publish(event);
    }

    pub fn apply_service_states(&mut self, incoming: Vec<ServiceState>) {
        ServiceState::update_all(&mut self.services, incoming);
        emit_event(
            Level::DEBUG,
            self.process,
            ObservabilityEvent {
                event: "services.reconciled",
                component: "service_state",
                count: Some(self.services.len()),
                ..Default::default()
            },
        );
        self.bus.publish(CacheEvent::ServicesReconciled {
            services: self.services.len(),
        });
    }

    /// Returns false when the context has no cached deployment.
    pub fn apply_remediations(&mut self, keptn_context: &str, info: &RemediationUpdate) -> bool {
        let Some(deployment) = self.deployments.get_mut(keptn_context) else {
            return false;
        };
        deployment.update_remediations(info);
        self.refresh_attached(keptn_context);
        self.bus.publish(CacheEvent::RemediationsUpdated {
            keptn_context: keptn_context.to_string(),
        });
        true
    }

    /// Open remediations of a service, derived from the ingested event trees.
    pub fn open_remediations(&self, service: &str) -> RemediationUpdate {
        RemediationUpdate::from_roots(
            self.forest
                .roots()
                .iter()
                .filter(|root| root.service() == Some(service)),
        )
    }

    /// Applies the remediations derived from ingested events to a deployment.
    pub fn sync_remediations(&mut self, keptn_context: &str) -> bool {
        let Some(service) = self
            .deployments
            .get(keptn_context)
            .map(|deployment| deployment.service.clone())
        else {
            return false;
        };
        let info = self.open_remediations(&service);
        self.apply_remediations(keptn_context, &info)
    }

    pub fn remove_approval(&mut self, keptn_context: &str, stage: &str) -> bool {
        let removed = self
            .deployments
            .get_mut(keptn_context)
            .is_some_and(|deployment| deployment.remove_approval(stage));
        if removed {
            self.refresh_attached(keptn_context);
            self.bus.publish(CacheEvent::ApprovalRemoved {
                keptn_context: keptn_context.to_string(),
                stage: stage.to_string(),
            });
        }
        removed
    }

    /// Resolves the cached deployment onto every service entry that
    /// references a known context.
    pub fn attach_deployments(&mut self) {
        for service in &mut self.services {
            for info in &mut service.deployment_information {
                if let Some(deployment) = self.deployments.get(&info.keptn_context) {
                    info.deployment = Some(deployment.clone());
                }
            }
        }
    }

    fn refresh_attached(&mut self, keptn_context: &str) {
        let Some(deployment) = self.deployments.get(keptn_context) else {
            return;
        };
        for service in &mut self.services {
            if let Some(info) = service.information_mut(keptn_context) {
                if info.deployment.is_some() {
                    info.deployment = Some(deployment.clone());
                }
            }
        }
    }
}
