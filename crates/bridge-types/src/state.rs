use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventResult {
    Pass,
    Warning,
    Fail,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Succeeded,
    Errored,
    #[serde(other)]
    Unknown,
}

/// Lifecycle state of a sequence or sub-sequence as reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SequenceState {
    Triggered,
    Started,
    Finished,
    Aborted,
    TimedOut,
    Waiting,
    Paused,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SequenceState {
    /// States after which no further task events are expected.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SequenceState::Finished | SequenceState::Aborted | SequenceState::TimedOut
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SequenceState::Triggered => "triggered",
            SequenceState::Started => "started",
            SequenceState::Finished => "finished",
            SequenceState::Aborted => "aborted",
            SequenceState::TimedOut => "timedOut",
            SequenceState::Waiting => "waiting",
            SequenceState::Paused => "paused",
            SequenceState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SequenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProblemState {
    Open,
    Resolved,
    Closed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProblemState {
    pub fn is_resolved_or_closed(self) -> bool {
        matches!(self, ProblemState::Resolved | ProblemState::Closed)
    }
}
