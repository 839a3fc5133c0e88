use bridge_deployments::{Deployment, RemediationUpdate, ServiceState};
use bridge_types::EventRecord;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, SnapshotError};

/// Parses an event page: either a bare array or an `{"events": [...]}` envelope.
pub fn parse_events(raw: &str) -> Result<Vec<EventRecord>> {
    parse_list(raw, "events")
}

pub fn parse_service_states(raw: &str) -> Result<Vec<ServiceState>> {
    parse_list(raw, "serviceStates")
}

pub fn parse_deployment(raw: &str) -> Result<Deployment> {
    Ok(serde_json::from_str(raw)?)
}

pub fn parse_remediations(raw: &str) -> Result<RemediationUpdate> {
    Ok(serde_json::from_str(raw)?)
}

fn parse_list<T: DeserializeOwned>(raw: &str, envelope_key: &str) -> Result<Vec<T>> {
    let value: Value = serde_json::from_str(raw)?;
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map.remove(envelope_key).ok_or_else(|| {
            SnapshotError::InvalidShape(format!("expected an array or a `{envelope_key}` field"))
        })?,
        other => {
            return Err(SnapshotError::InvalidShape(format!(
                "expected an array, found {}",
                type_name(&other)
            )))
        }
    };
    Ok(serde_json::from_value(list)?)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
