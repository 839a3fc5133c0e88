use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{EventType, ProblemState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "ProblemTitle", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "State", default)]
    pub state: ProblemState,
    #[serde(rename = "ProblemID", default, skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ApprovalDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliMetric {
    pub metric: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliResult {
    pub value: SliMetric,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationDetails {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub indicator_results: Vec<SliResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeploymentDetails {
    #[serde(rename = "deploymentstrategy", default)]
    pub strategy: Option<String>,
    #[serde(rename = "deploymentURIsPublic", default)]
    pub public_urls: Vec<String>,
    #[serde(rename = "deploymentURIsLocal", default)]
    pub local_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RemediationActionDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Task-specific payload of an event, keyed by the event type.
/// Anything that does not match a known shape lands in `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Problem(ProblemDetails),
    Approval(ApprovalDetails),
    Evaluation(EvaluationDetails),
    Deployment(DeploymentDetails),
    RemediationAction(RemediationActionDetails),
    Other(Map<String, Value>),
}

impl EventPayload {
    pub fn from_event(kind: &EventType<'_>, extra: &Map<String, Value>) -> Self {
        let typed = if kind.is_problem() {
            decode(Value::Object(extra.clone())).map(EventPayload::Problem)
        } else if kind.is_approval() {
            decode_key(extra, "approval").map(EventPayload::Approval)
        } else if kind.is_evaluation() {
            decode_key(extra, "evaluation").map(EventPayload::Evaluation)
        } else if kind.is_deployment() {
            decode_key(extra, "deployment").map(EventPayload::Deployment)
        } else if kind.is_remediation_action() {
            decode_key(extra, "action").map(EventPayload::RemediationAction)
        } else {
            None
        };
        typed.unwrap_or_else(|| EventPayload::Other(extra.clone()))
    }

    pub fn problem(&self) -> Option<&ProblemDetails> {
        match self {
            EventPayload::Problem(details) => Some(details),
            _ => None,
        }
    }

    pub fn evaluation(&self) -> Option<&EvaluationDetails> {
        match self {
            EventPayload::Evaluation(details) => Some(details),
            _ => None,
        }
    }
}

/// Image reference of a deployment, read from `configurationChange.values.image`.
pub fn configured_image(extra: &Map<String, Value>) -> Option<&str> {
    extra
        .get("configurationChange")?
        .get("values")?
        .get("image")?
        .as_str()
}

fn decode_key<T: DeserializeOwned>(extra: &Map<String, Value>, key: &str) -> Option<T> {
    extra.get(key).cloned().and_then(decode)
}

fn decode<T: DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value).ok()
}
