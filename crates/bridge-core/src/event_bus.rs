use serde::Serialize;
use tokio::sync::broadcast;

use crate::DEFAULT_EVENT_BUFFER;

/// Change notification published after each cache mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    EventsIngested {
        roots_created: usize,
        attached: usize,
        orphans: usize,
    },
    DeploymentCreated {
        keptn_context: String,
    },
    DeploymentUpdated {
        keptn_context: String,
    },
    RemediationsUpdated {
        keptn_context: String,
    },
    ApprovalRemoved {
        keptn_context: String,
        stage: String,
    },
    ServicesReconciled {
        services: usize,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CacheEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_BUFFER)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: CacheEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
