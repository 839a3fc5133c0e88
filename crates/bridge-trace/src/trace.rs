use bridge_types::{configured_image, EventPhase, EventRecord, EventType, ProblemState};
use serde::{Deserialize, Serialize};

use crate::verdict::{summarize, Verdict, VerdictSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    Resolved,
    Opened,
    Failed,
    Succeeded,
    Active,
}

impl TraceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TraceStatus::Resolved => "resolved",
            TraceStatus::Opened => "opened",
            TraceStatus::Failed => "failed",
            TraceStatus::Succeeded => "succeeded",
            TraceStatus::Active => "active",
        }
    }
}

pub const LABEL_WAITING_FOR_APPROVAL: &str = "waiting for approval";
pub const LABEL_STARTED: &str = "started";

/// One event plus the events causally linked to it, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(flatten)]
    pub event: EventRecord,
    #[serde(default)]
    pub traces: Vec<Trace>,
}

impl Trace {
    pub fn new(event: EventRecord) -> Self {
        Self {
            event,
            traces: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.event.id
    }

    pub fn kind(&self) -> EventType<'_> {
        self.event.kind()
    }

    pub fn stage(&self) -> Option<&str> {
        self.event.stage()
    }

    pub fn is_problem(&self) -> bool {
        self.kind().is_problem()
    }

    pub fn is_approval(&self) -> bool {
        self.kind().is_approval()
    }

    pub fn is_evaluation(&self) -> bool {
        self.kind().is_evaluation()
    }

    pub fn is_deployment(&self) -> bool {
        self.kind().is_deployment()
    }

    pub fn is_remediation(&self) -> bool {
        self.kind().is_remediation_sequence()
    }

    pub fn is_remediation_action(&self) -> bool {
        self.kind().is_remediation_action()
    }

    /// Depth-first, pre-order walk over this node and all descendants.
    pub fn walk(&self) -> Vec<&Trace> {
        let mut out = vec![self];
        for child in &self.traces {
            out.extend(child.walk());
        }
        out
    }

    pub fn find_trace(&self, id: &str) -> Option<&Trace> {
        if self.id() == id {
            return Some(self);
        }
        self.traces.iter().find_map(|child| child.find_trace(id))
    }

    pub fn find_trace_mut(&mut self, id: &str) -> Option<&mut Trace> {
        if self.id() == id {
            return Some(self);
        }
        self.traces
            .iter_mut()
            .find_map(|child| child.find_trace_mut(id))
    }

    /// The most recently attached descendant, following last children down.
    pub fn last_trace(&self) -> &Trace {
        match self.traces.last() {
            Some(child) => child.last_trace(),
            None => self,
        }
    }

    /// The `finished` event that closes this step, if it has arrived.
    pub fn finished_event(&self) -> Option<&EventRecord> {
        if self.kind().is_finished() {
            return Some(&self.event);
        }
        self.walk()
            .into_iter()
            .skip(1)
            .map(|trace| &trace.event)
            .find(|event| {
                event.kind().is_finished() && event.triggeredid.as_deref() == Some(self.id())
            })
    }

    /// A leaf is finished only when it is itself a `finished` event; inner
    /// nodes are finished once every child is. A bare `started` or
    /// `status.changed` child counts as finished once a `finished` event
    /// below this node answers the same trigger.
    pub fn is_finished(&self) -> bool {
        if self.traces.is_empty() {
            return self.kind().is_finished();
        }
        self.traces
            .iter()
            .all(|child| child.is_finished() || self.answers_progress_of(child))
    }

    fn answers_progress_of(&self, child: &Trace) -> bool {
        if !child.traces.is_empty()
            || !matches!(
                child.kind().phase(),
                EventPhase::Started | EventPhase::StatusChanged
            )
        {
            return false;
        }
        let Some(trigger) = child.event.triggeredid.as_deref() else {
            return false;
        };
        self.walk().into_iter().any(|trace| {
            trace.kind().is_finished() && trace.event.triggeredid.as_deref() == Some(trigger)
        })
    }

    /// Latest problem state reported anywhere in this subtree.
    pub fn problem_state(&self) -> Option<ProblemState> {
        self.walk()
            .into_iter()
            .filter(|trace| trace.is_problem())
            .filter_map(|trace| trace.event.payload().problem().map(|p| p.state))
            .last()
    }

    pub fn is_problem_resolved_or_closed(&self) -> bool {
        self.problem_state()
            .is_some_and(ProblemState::is_resolved_or_closed)
    }

    /// What this step reports to its parent.
    pub fn verdict(&self) -> Verdict {
        if self.is_problem() {
            return match self.problem_state() {
                Some(ProblemState::Open) => Verdict::Failed,
                Some(state) if state.is_resolved_or_closed() => Verdict::Passed,
                _ => Verdict::Undecided,
            };
        }
        if let Some(finished) = self.finished_event() {
            if finished.is_failed() {
                return Verdict::Failed;
            }
            if finished.is_warning() {
                return Verdict::Warning;
            }
            if finished.is_passed() {
                return Verdict::Passed;
            }
            return Verdict::Undecided;
        }
        let summary = self.summary(None);
        if summary.faulty {
            Verdict::Failed
        } else if summary.successful {
            Verdict::Passed
        } else if summary.warning {
            Verdict::Warning
        } else {
            Verdict::Undecided
        }
    }

    /// Folds the verdicts of direct children, optionally scoped to a stage.
    /// Children without a stage never take part in a stage-scoped fold.
    pub fn summary(&self, stage: Option<&str>) -> VerdictSummary {
        let mut summary = summarize(self.children_in(stage).map(Trace::verdict));
        summary.warning = self.children_in(stage).any(Trace::reports_warning);
        summary
    }

    pub fn is_faulty(&self, stage: Option<&str>) -> bool {
        self.summary(stage).faulty
    }

    pub fn is_successful(&self, stage: Option<&str>) -> bool {
        self.summary(stage).successful
    }

    pub fn is_warning(&self, stage: Option<&str>) -> bool {
        self.summary(stage).warning
    }

    fn reports_warning(&self) -> bool {
        self.verdict() == Verdict::Warning || self.traces.iter().any(Trace::reports_warning)
    }

    fn children_in<'a>(&'a self, stage: Option<&'a str>) -> impl Iterator<Item = &'a Trace> + 'a {
        self.traces
            .iter()
            .filter(move |child| stage.is_none() || child.stage() == stage)
    }

    pub fn status(&self) -> TraceStatus {
        if self.is_problem() {
            return if self.is_problem_resolved_or_closed() {
                TraceStatus::Resolved
            } else {
                TraceStatus::Opened
            };
        }
        if self.is_finished() {
            if self.is_faulty(None) {
                TraceStatus::Failed
            } else {
                TraceStatus::Succeeded
            }
        } else {
            TraceStatus::Active
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.status() {
            TraceStatus::Active if self.has_pending_approval_anywhere() => {
                LABEL_WAITING_FOR_APPROVAL
            }
            TraceStatus::Active => LABEL_STARTED,
            other => other.as_str(),
        }
    }

    /// Approval gate that was triggered but has not been answered yet.
    pub fn is_pending_approval(&self) -> bool {
        self.is_approval() && self.kind().is_triggered() && self.finished_event().is_none()
    }

    pub fn has_pending_approval_anywhere(&self) -> bool {
        self.walk().into_iter().any(Trace::is_pending_approval)
    }

    /// Latest finished evaluation, optionally restricted to one stage.
    pub fn evaluation(&self, stage: Option<&str>) -> Option<&EventRecord> {
        self.walk()
            .into_iter()
            .map(|trace| &trace.event)
            .filter(|event| event.kind().is_evaluation() && event.kind().is_finished())
            .filter(|event| stage.is_none() || event.stage() == stage)
            .last()
    }

    /// Image being rolled out, read from the deployment trigger payload.
    pub fn deployment_image(&self) -> Option<&str> {
        self.walk()
            .into_iter()
            .filter(|trace| trace.is_deployment())
            .find_map(|trace| configured_image(&trace.event.data.extra))
    }
}
