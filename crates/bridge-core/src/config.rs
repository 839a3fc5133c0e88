use std::fs;
use std::path::{Path, PathBuf};

use bridge_observability::{default_logs_dir, LogSettings};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{DEFAULT_EVENT_BUFFER, DEFAULT_LOG_RETENTION_DAYS, DEFAULT_POLL_INTERVAL_MS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Capacity of the cache change channel.
    pub event_buffer: usize,
    /// Advisory refresh interval for the host's poller.
    pub poll_interval_ms: u64,
    pub logs_retention_days: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            logs_retention_days: DEFAULT_LOG_RETENTION_DAYS,
            logs_dir: None,
        }
    }
}

impl BridgeConfig {
    /// Logging settings, falling back to `<data_root>/logs` when no
    /// directory is configured.
    pub fn log_settings(&self, data_root: &Path) -> LogSettings {
        let dir = self
            .logs_dir
            .clone()
            .unwrap_or_else(|| default_logs_dir(data_root));
        LogSettings::new(dir, self.logs_retention_days)
    }
}

#[derive(Debug, Clone, Default)]
struct ConfigLayers {
    defaults: Value,
    file: Value,
    env: Value,
    runtime: Value,
}

/// Layered configuration: defaults, then the JSON file, then `BRIDGE_*`
/// environment variables, then runtime patches.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    layers: ConfigLayers,
}

impl ConfigStore {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => read_json_file(path)?,
            None => empty_object(),
        };
        Ok(Self::from_layers(
            path.map(Path::to_path_buf),
            file,
            env_layer(|key| std::env::var(key).ok()),
        ))
    }

    fn from_layers(path: Option<PathBuf>, file: Value, env: Value) -> Self {
        let defaults =
            serde_json::to_value(BridgeConfig::default()).unwrap_or_else(|_| empty_object());
        Self {
            path,
            layers: ConfigLayers {
                defaults,
                file,
                env,
                runtime: empty_object(),
            },
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self) -> BridgeConfig {
        serde_json::from_value(self.effective_value()).unwrap_or_default()
    }

    pub fn effective_value(&self) -> Value {
        let mut merged = empty_object();
        deep_merge(&mut merged, &self.layers.defaults);
        deep_merge(&mut merged, &self.layers.file);
        deep_merge(&mut merged, &self.layers.env);
        deep_merge(&mut merged, &self.layers.runtime);
        merged
    }

    pub fn layers_value(&self) -> Value {
        json!({
            "defaults": self.layers.defaults,
            "file": self.layers.file,
            "env": self.layers.env,
            "runtime": self.layers.runtime,
        })
    }

    pub fn patch_runtime(&mut self, patch: Value) -> Value {
        deep_merge(&mut self.layers.runtime, &patch);
        self.effective_value()
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn read_json_file(path: &Path) -> anyhow::Result<Value> {
    if !path.exists() {
        return Ok(empty_object());
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str::<Value>(&raw)?)
}

fn env_layer(lookup: impl Fn(&str) -> Option<String>) -> Value {
    let mut root = empty_object();
    if let Some(buffer) =
        lookup("BRIDGE_EVENT_BUFFER").and_then(|raw| raw.trim().parse::<u64>().ok())
    {
        deep_merge(&mut root, &json!({ "event_buffer": buffer }));
    }
    if let Some(interval) =
        lookup("BRIDGE_POLL_INTERVAL_MS").and_then(|raw| raw.trim().parse::<u64>().ok())
    {
        deep_merge(&mut root, &json!({ "poll_interval_ms": interval }));
    }
    if let Some(days) =
        lookup("BRIDGE_LOG_RETENTION_DAYS").and_then(|raw| raw.trim().parse::<u64>().ok())
    {
        deep_merge(&mut root, &json!({ "logs_retention_days": days }));
    }
    if let Some(dir) = lookup("BRIDGE_LOGS_DIR").filter(|raw| !raw.trim().is_empty()) {
        deep_merge(&mut root, &json!({ "logs_dir": dir.trim() }));
    }
    root
}

fn deep_merge(base: &mut Value, overlay: &Value) {
    if overlay.is_null() {
        return;
    }
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if value.is_null() {
                    continue;
                }
                match base_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value.clone();
        }
    }
}
