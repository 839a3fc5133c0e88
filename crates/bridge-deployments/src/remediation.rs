use bridge_trace::{Root, Trace};
use bridge_types::{EventPayload, EventResult, SequenceState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationAction {
    pub name: String,
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub state: SequenceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<EventResult>,
}

impl RemediationAction {
    fn from_chunk(chunk: &Trace) -> Self {
        let details = match chunk.event.payload() {
            EventPayload::RemediationAction(details) => details,
            _ => Default::default(),
        };
        let state = if chunk.is_finished() && !chunk.traces.is_empty() {
            SequenceState::Finished
        } else if chunk.traces.iter().any(|t| t.kind().is_started()) {
            SequenceState::Started
        } else {
            SequenceState::Triggered
        };
        Self {
            name: details.name.unwrap_or_else(|| chunk.label()),
            action: details.action.unwrap_or_default(),
            description: details.description,
            state,
            result: chunk
                .traces
                .iter()
                .rev()
                .find(|t| t.kind().is_finished())
                .and_then(|t| t.event.data.result),
        }
    }
}

/// Summary of one remediation run that is still open for a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationSummary {
    pub keptn_context: String,
    pub name: String,
    #[serde(default)]
    pub state: SequenceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actions: Vec<RemediationAction>,
}

impl RemediationSummary {
    pub fn new(keptn_context: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            keptn_context: keptn_context.into(),
            name: name.into(),
            state: SequenceState::Triggered,
            problem_title: None,
            time: None,
            actions: Vec::new(),
        }
    }

    /// Summarizes a remediation root; `None` for any other kind of run.
    pub fn from_root(root: &Root) -> Option<Self> {
        if !root.is_remediation() {
            return None;
        }
        let state = if root.is_finished() {
            SequenceState::Finished
        } else {
            SequenceState::Started
        };
        Some(Self {
            keptn_context: root.keptn_context().to_string(),
            name: root.kind().name().to_string(),
            state,
            problem_title: root.problem_title(),
            time: Some(root.event.time),
            actions: root
                .action_sequences()
                .iter()
                .map(RemediationAction::from_chunk)
                .collect(),
        })
    }

    pub fn is_open(&self) -> bool {
        !self.state.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRemediations {
    pub name: String,
    #[serde(default)]
    pub remediations: Vec<RemediationSummary>,
}

/// Full per-stage remediation report for one service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationUpdate {
    #[serde(default)]
    pub stages: Vec<StageRemediations>,
}

impl RemediationUpdate {
    /// Open remediations of the given roots, grouped by stage in first-seen order.
    pub fn from_roots<'a>(roots: impl IntoIterator<Item = &'a Root>) -> Self {
        let mut update = Self::default();
        for root in roots {
            let Some(stage) = root.stage() else { continue };
            let Some(summary) = RemediationSummary::from_root(root) else {
                continue;
            };
            if !summary.is_open() {
                continue;
            }
            match update.stages.iter_mut().find(|s| s.name == stage) {
                Some(entry) => entry.remediations.push(summary),
                None => update.stages.push(StageRemediations {
                    name: stage.to_string(),
                    remediations: vec![summary],
                }),
            }
        }
        update
    }

    pub fn for_stage(&self, stage: &str) -> Option<&[RemediationSummary]> {
        self.stages
            .iter()
            .find(|entry| entry.name == stage)
            .map(|entry| entry.remediations.as_slice())
    }
}
