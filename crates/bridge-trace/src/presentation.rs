use bridge_types::{EventResult, EventType};

use crate::trace::{Trace, TraceStatus};

pub const DEFAULT_ICON: &str = "information";
pub const DEFAULT_COLOR: &str = "#b0b0b0";

/// Task name to icon. Sequences and unknown tasks use [`DEFAULT_ICON`].
pub const EVENT_ICONS: &[(&str, &str)] = &[
    ("deployment", "deploy"),
    ("test", "perfomance-health"),
    ("evaluation", "traffic-light"),
    ("release", "cloud-deploy"),
    ("approval", "unknown"),
    ("get-action", "lightbulb"),
    ("action", "build"),
    ("problem", "warning"),
    ("rollback", "undo"),
];

pub const EVENT_LABELS: &[(&str, &str)] = &[
    ("deployment", "Deployment"),
    ("test", "Tests"),
    ("evaluation", "Evaluation"),
    ("release", "Release"),
    ("approval", "Approval"),
    ("get-action", "Get action"),
    ("action", "Remediation action"),
    ("problem", "Problem"),
    ("rollback", "Rollback"),
];

pub const RESULT_COLORS: &[(EventResult, &str)] = &[
    (EventResult::Pass, "#7dc540"),
    (EventResult::Warning, "#e6be00"),
    (EventResult::Fail, "#dc172a"),
];

fn lookup<K: PartialEq, V: Copy>(table: &[(K, V)], key: &K) -> Option<V> {
    table
        .iter()
        .find(|(candidate, _)| candidate == key)
        .map(|(_, value)| *value)
}

pub fn icon_for(kind: &EventType<'_>) -> &'static str {
    let key = if kind.is_problem() { "problem" } else { kind.name() };
    lookup(EVENT_ICONS, &key).unwrap_or(DEFAULT_ICON)
}

/// Display label for an event type. Sequences read `<name> in <stage>`.
pub fn label_for(kind: &EventType<'_>) -> String {
    if kind.is_problem() {
        return "Problem".to_string();
    }
    if let Some((stage, name)) = kind.sequence() {
        return format!("{name} in {stage}");
    }
    match lookup(EVENT_LABELS, &kind.name()) {
        Some(label) => label.to_string(),
        None => kind.name().to_string(),
    }
}

pub fn color_for(result: Option<EventResult>) -> &'static str {
    result
        .and_then(|result| lookup(RESULT_COLORS, &result))
        .unwrap_or(DEFAULT_COLOR)
}

pub fn status_color(status: TraceStatus) -> &'static str {
    match status {
        TraceStatus::Failed | TraceStatus::Opened => color_for(Some(EventResult::Fail)),
        TraceStatus::Succeeded | TraceStatus::Resolved => color_for(Some(EventResult::Pass)),
        TraceStatus::Active => DEFAULT_COLOR,
    }
}

impl Trace {
    pub fn icon(&self) -> &'static str {
        icon_for(&self.kind())
    }

    pub fn label(&self) -> String {
        label_for(&self.kind())
    }

    /// Color of the result carried by this step's finished event.
    pub fn result_color(&self) -> &'static str {
        color_for(self.finished_event().and_then(|event| event.data.result))
    }
}
