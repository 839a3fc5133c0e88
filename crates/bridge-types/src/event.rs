use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{EventPayload, EventResult, EventStatus, EventType};

/// Common payload fields carried by every workflow event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<EventResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    /// Task-specific keys, typed on demand through [`EventRecord::payload`].
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: DateTime<Utc>,
    pub shkeptncontext: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggeredid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub data: EventData,
}

impl EventRecord {
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        time: DateTime<Utc>,
        shkeptncontext: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            time,
            shkeptncontext: shkeptncontext.into(),
            triggeredid: None,
            source: None,
            data: EventData::default(),
        }
    }

    pub fn with_triggeredid(mut self, triggeredid: impl Into<String>) -> Self {
        self.triggeredid = Some(triggeredid.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.data.stage = Some(stage.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.data.service = Some(service.into());
        self
    }

    pub fn with_result(mut self, result: EventResult) -> Self {
        self.data.result = Some(result);
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.data.status = Some(status);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.extra.insert(key.into(), value);
        self
    }

    pub fn kind(&self) -> EventType<'_> {
        EventType::parse(&self.event_type)
    }

    pub fn stage(&self) -> Option<&str> {
        self.data.stage.as_deref()
    }

    pub fn service(&self) -> Option<&str> {
        self.data.service.as_deref()
    }

    pub fn project(&self) -> Option<&str> {
        self.data.project.as_deref()
    }

    pub fn payload(&self) -> EventPayload {
        EventPayload::from_event(&self.kind(), &self.data.extra)
    }

    pub fn is_failed(&self) -> bool {
        self.data.result == Some(EventResult::Fail)
            || self.data.status == Some(EventStatus::Errored)
    }

    pub fn is_warning(&self) -> bool {
        self.data.result == Some(EventResult::Warning)
    }

    /// A pass, or a clean `succeeded` status when no result was reported.
    pub fn is_passed(&self) -> bool {
        if self.is_failed() {
            return false;
        }
        match self.data.result {
            Some(EventResult::Pass) => true,
            None => self.data.status == Some(EventStatus::Succeeded),
            _ => false,
        }
    }
}
