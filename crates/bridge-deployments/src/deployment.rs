use std::collections::BTreeMap;

use bridge_types::SequenceState;
use serde::{Deserialize, Serialize};

use crate::remediation::RemediationUpdate;
use crate::stage::{keep_or_replace, StageDeployment, StageDeploymentStateInfo};

/// Cached per-service projection of one execution context across stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub keptn_context: String,
    pub service: String,
    #[serde(default)]
    pub stages: Vec<StageDeployment>,
    #[serde(default)]
    pub state: SequenceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Deployment {
    pub fn new(keptn_context: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            keptn_context: keptn_context.into(),
            service: service.into(),
            stages: Vec::new(),
            state: SequenceState::Unknown,
            labels: None,
            image: None,
        }
    }

    pub fn stage(&self, name: &str) -> Option<&StageDeployment> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    pub fn stage_mut(&mut self, name: &str) -> Option<&mut StageDeployment> {
        self.stages.iter_mut().find(|stage| stage.name == name)
    }

    /// Merges a fresh snapshot of the same context into this cached object.
    /// Snapshots for a different context are ignored.
    pub fn update(&mut self, incoming: Deployment) {
        if incoming.keptn_context != self.keptn_context {
            tracing::warn!(
                cached = %self.keptn_context,
                incoming = %incoming.keptn_context,
                "ignoring deployment snapshot for another context"
            );
            return;
        }
        if incoming.state != SequenceState::Unknown {
            self.state = incoming.state;
        }
        keep_or_replace(&mut self.labels, incoming.labels);
        keep_or_replace(&mut self.image, incoming.image);

        for stage in incoming.stages {
            match self.stage_mut(&stage.name) {
                Some(cached) => cached.update(stage),
                None => {
                    tracing::debug!(
                        keptn_context = %self.keptn_context,
                        stage = %stage.name,
                        "deployment reached a new stage"
                    );
                    self.stages.push(stage);
                }
            }
        }
    }

    /// Returns false when the stage is not part of this deployment.
    pub fn remove_approval(&mut self, stage: &str) -> bool {
        match self.stage_mut(stage) {
            Some(stage) => {
                stage.remove_approval();
                true
            }
            None => false,
        }
    }

    /// Replaces every stage's open remediations with the reported set;
    /// stages missing from the report are cleared.
    pub fn update_remediations(&mut self, info: &RemediationUpdate) {
        for stage in &mut self.stages {
            stage.open_remediations = info
                .for_stage(&stage.name)
                .map(<[_]>::to_vec)
                .unwrap_or_default();
        }
    }

    pub fn is_finished(&self) -> bool {
        !self.stages.is_empty() && self.stages.iter().all(StageDeployment::is_finished)
    }

    pub fn has_pending_approval(&self) -> bool {
        self.stages.iter().any(StageDeployment::has_pending_approval)
    }

    pub fn stage_state_info(&self, stage: &str) -> Option<StageDeploymentStateInfo> {
        let mut info = self.stage(stage)?.state_info();
        info.is_aborted |= self.state == SequenceState::Aborted;
        Some(info)
    }
}
