use serde::{Deserialize, Serialize};

pub const KEPTN_EVENT_PREFIX: &str = "sh.keptn.event.";
pub const LEGACY_PROBLEM_EVENT: &str = "sh.keptn.events.problem";

pub const APPROVAL_TASK: &str = "approval";
pub const EVALUATION_TASK: &str = "evaluation";
pub const DEPLOYMENT_TASK: &str = "deployment";
pub const ACTION_TASK: &str = "action";
pub const REMEDIATION_SEQUENCE: &str = "remediation";
pub const PROBLEM_TASK: &str = "problem";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    Triggered,
    Started,
    StatusChanged,
    Finished,
    Invalidated,
    Other,
}

impl EventPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            EventPhase::Triggered => "triggered",
            EventPhase::Started => "started",
            EventPhase::StatusChanged => "status.changed",
            EventPhase::Finished => "finished",
            EventPhase::Invalidated => "invalidated",
            EventPhase::Other => "other",
        }
    }
}

/// Borrowed, parsed view of a dot-delimited event type such as
/// `sh.keptn.event.dev.delivery.triggered` or `deployment.finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventType<'a> {
    raw: &'a str,
    body: &'a str,
    phase: EventPhase,
}

impl<'a> EventType<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let trimmed = raw.strip_prefix(KEPTN_EVENT_PREFIX).unwrap_or(raw);
        let (body, phase) = split_phase(trimmed);
        Self { raw, body, phase }
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    pub fn segments(&self) -> impl Iterator<Item = &'a str> {
        self.body.split('.').filter(|segment| !segment.is_empty())
    }

    /// Task name for single-segment task events (`deployment.started`).
    pub fn task(&self) -> Option<&'a str> {
        let mut segments = self.segments();
        let first = segments.next()?;
        if segments.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// `(stage, sequence)` for sequence events (`dev.delivery.triggered`).
    pub fn sequence(&self) -> Option<(&'a str, &'a str)> {
        let mut segments = self.segments();
        let stage = segments.next()?;
        let name = segments.next()?;
        if segments.next().is_some() || stage == PROBLEM_TASK {
            return None;
        }
        Some((stage, name))
    }

    /// The short name shown for this event: the task or sequence name.
    pub fn name(&self) -> &'a str {
        if let Some(task) = self.task() {
            return task;
        }
        if let Some((_, name)) = self.sequence() {
            return name;
        }
        self.body
    }

    pub fn is_triggered(&self) -> bool {
        self.phase == EventPhase::Triggered
    }

    pub fn is_started(&self) -> bool {
        self.phase == EventPhase::Started
    }

    pub fn is_finished(&self) -> bool {
        self.phase == EventPhase::Finished
    }

    pub fn is_problem(&self) -> bool {
        self.raw == LEGACY_PROBLEM_EVENT || self.segments().next() == Some(PROBLEM_TASK)
    }

    pub fn is_approval(&self) -> bool {
        self.task() == Some(APPROVAL_TASK)
    }

    pub fn is_evaluation(&self) -> bool {
        self.task() == Some(EVALUATION_TASK)
    }

    pub fn is_deployment(&self) -> bool {
        self.task() == Some(DEPLOYMENT_TASK)
    }

    pub fn is_remediation_action(&self) -> bool {
        self.task() == Some(ACTION_TASK)
    }

    /// Marker that opens a new remediation action chunk.
    pub fn is_action_triggered(&self) -> bool {
        self.is_remediation_action() && self.is_triggered()
    }

    pub fn is_remediation_sequence(&self) -> bool {
        matches!(self.sequence(), Some((_, REMEDIATION_SEQUENCE)))
    }
}

fn split_phase(body: &str) -> (&str, EventPhase) {
    if let Some(rest) = body.strip_suffix(".status.changed") {
        return (rest, EventPhase::StatusChanged);
    }
    let Some((rest, last)) = body.rsplit_once('.') else {
        return (body, EventPhase::Other);
    };
    let phase = match last {
        "triggered" => EventPhase::Triggered,
        "started" => EventPhase::Started,
        "finished" => EventPhase::Finished,
        "invalidated" => EventPhase::Invalidated,
        _ => return (body, EventPhase::Other),
    };
    (rest, phase)
}
