use std::sync::Arc;

use bridge_deployments::{Deployment, RemediationUpdate, ServiceState};
use bridge_trace::AppendReport;
use bridge_types::EventRecord;
use tokio::sync::{broadcast, RwLock, RwLockReadGuard};

use crate::cache::DashboardCache;
use crate::config::BridgeConfig;
use crate::event_bus::{CacheEvent, EventBus};

/// Cloneable handle for hosts that poll from several tasks. Writers are
/// serialized by the lock; readers share it.
#[derive(Clone)]
pub struct SharedCache {
    inner: Arc<RwLock<DashboardCache>>,
    bus: EventBus,
}

impl SharedCache {
    pub fn new(config: &BridgeConfig) -> Self {
        let cache = DashboardCache::new(config);
        let bus = cache.bus().clone();
        Self {
            inner: Arc::new(RwLock::new(cache)),
            bus,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.bus.subscribe()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, DashboardCache> {
        self.inner.read().await
    }

    pub async fn ingest_events(&self, events: Vec<EventRecord>) -> AppendReport {
        self.inner.write().await.ingest_events(events)
    }

    pub async fn apply_deployment(&self, deployment: Deployment) {
        self.inner.write().await.apply_deployment(deployment);
    }

    pub async fn apply_service_states(&self, services: Vec<ServiceState>) {
        let mut cache = self.inner.write().await;
        cache.apply_service_states(services);
        cache.attach_deployments();
    }

    pub async fn apply_remediations(&self, keptn_context: &str, info: &RemediationUpdate) -> bool {
        self.inner
            .write()
            .await
            .apply_remediations(keptn_context, info)
    }

    pub async fn sync_remediations(&self, keptn_context: &str) -> bool {
        self.inner.write().await.sync_remediations(keptn_context)
    }

    pub async fn remove_approval(&self, keptn_context: &str, stage: &str) -> bool {
        self.inner
            .write()
            .await
            .remove_approval(keptn_context, stage)
    }
}
