use std::ops::Deref;

use bridge_types::{EventRecord, ProblemDetails};
use serde::{Deserialize, Serialize};

use crate::chunk::chunk_sequences;
use crate::trace::Trace;

/// Top-level trace of one execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Root {
    trace: Trace,
}

impl Root {
    pub fn new(event: EventRecord) -> Self {
        Self {
            trace: Trace::new(event),
        }
    }

    pub fn keptn_context(&self) -> &str {
        &self.trace.event.shkeptncontext
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub(crate) fn trace_mut(&mut self) -> &mut Trace {
        &mut self.trace
    }

    /// Stage names of direct children, deduplicated in first-seen order.
    pub fn stages(&self) -> Vec<&str> {
        let mut stages: Vec<&str> = Vec::new();
        for stage in self.trace.traces.iter().filter_map(Trace::stage) {
            if !stages.contains(&stage) {
                stages.push(stage);
            }
        }
        stages
    }

    /// The last approval gate triggered in `stage`.
    pub fn last_approval(&self, stage: &str) -> Option<&Trace> {
        self.trace
            .walk()
            .into_iter()
            .filter(|trace| trace.is_approval() && trace.kind().is_triggered())
            .filter(|trace| trace.stage() == Some(stage))
            .last()
    }

    pub fn has_pending_approval(&self, stage: &str) -> bool {
        self.last_approval(stage)
            .is_some_and(Trace::is_pending_approval)
    }

    /// Children of a remediation run, exposed as-is.
    pub fn remediation_actions(&self) -> &[Trace] {
        if self.trace.is_remediation() {
            &self.trace.traces
        } else {
            &[]
        }
    }

    /// Remediation actions regrouped into one sequence per `action.triggered`.
    pub fn action_sequences(&self) -> Vec<Trace> {
        if !self.trace.is_remediation() {
            return Vec::new();
        }
        let mut flat: Vec<Trace> = self
            .trace
            .walk()
            .into_iter()
            .skip(1)
            .map(|trace| Trace::new(trace.event.clone()))
            .collect();
        flat.sort_by(|a, b| a.event.time.cmp(&b.event.time));
        chunk_sequences(&flat)
    }

    /// Title of the problem behind this run. Remediations carry it under
    /// their own `problem` key.
    pub fn problem_title(&self) -> Option<String> {
        self.trace
            .walk()
            .into_iter()
            .filter(|trace| trace.is_problem())
            .find_map(|trace| trace.event.payload().problem().and_then(|p| p.title.clone()))
            .or_else(|| {
                let problem = self.trace.event.data.extra.get("problem")?;
                serde_json::from_value::<ProblemDetails>(problem.clone())
                    .ok()?
                    .title
            })
    }

    pub fn service(&self) -> Option<&str> {
        self.trace.event.service()
    }

    pub fn project(&self) -> Option<&str> {
        self.trace.event.project()
    }
}

impl Deref for Root {
    type Target = Trace;

    fn deref(&self) -> &Self::Target {
        &self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_types::EventResult;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn event(id: &str, kind: &str, minute: i64) -> EventRecord {
        let base = Utc.with_ymd_and_hms(2021, 5, 10, 9, 0, 0).unwrap();
        EventRecord::new(id, kind, base + Duration::minutes(minute), "ctx-1")
    }

    #[test]
    fn stages_keep_first_seen_order() {
        let mut root = Root::new(event("r", "sh.keptn.event.staging.delivery.triggered", 0));
        for (i, stage) in ["staging", "dev", "staging", "production"].iter().enumerate() {
            root.trace_mut().traces.push(Trace::new(
                event(&format!("t{i}"), "sh.keptn.event.deployment.triggered", i as i64 + 1)
                    .with_stage(*stage),
            ));
        }
        assert_eq!(root.stages(), vec!["staging", "dev", "production"]);
    }

    #[test]
    fn pending_approval_is_resolved_by_its_finished_event() {
        let mut root = Root::new(event("r", "sh.keptn.event.dev.delivery.triggered", 0));
        let mut approval =
            Trace::new(event("a", "sh.keptn.event.approval.triggered", 1).with_stage("dev"));
        root.trace_mut().traces.push(approval.clone());
        assert!(root.has_pending_approval("dev"));
        assert!(!root.has_pending_approval("staging"));

        approval.traces.push(Trace::new(
            event("a-f", "sh.keptn.event.approval.finished", 2)
                .with_triggeredid("a")
                .with_stage("dev")
                .with_result(EventResult::Pass),
        ));
        root.trace_mut().traces = vec![approval];
        assert!(!root.has_pending_approval("dev"));
    }

    #[test]
    fn only_remediation_roots_expose_actions() {
        let mut remediation = Root::new(event(
            "r",
            "sh.keptn.event.production.remediation.triggered",
            0,
        ));
        remediation
            .trace_mut()
            .traces
            .push(Trace::new(event("x", "sh.keptn.event.action.triggered", 1)));
        assert_eq!(remediation.remediation_actions().len(), 1);

        let delivery = Root::new(event("d", "sh.keptn.event.dev.delivery.triggered", 0));
        assert!(delivery.remediation_actions().is_empty());
        assert!(delivery.action_sequences().is_empty());
    }

    #[test]
    fn problem_title_comes_from_the_problem_payload() {
        let root = Root::new(
            event("p", "sh.keptn.event.problem.open", 0)
                .with_extra("State", json!("OPEN"))
                .with_extra("ProblemTitle", json!("Failure rate increase")),
        );
        assert_eq!(root.problem_title().as_deref(), Some("Failure rate increase"));
        assert_eq!(root.keptn_context(), "ctx-1");

        let remediation = Root::new(
            event("r", "sh.keptn.event.production.remediation.triggered", 0)
                .with_extra("problem", json!({"ProblemTitle": "Response time degradation"})),
        );
        assert_eq!(remediation.problem_title().as_deref(), Some("Response time degradation"));
    }
}
