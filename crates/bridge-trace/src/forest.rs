use std::collections::{HashMap, HashSet};

use bridge_types::EventRecord;

use crate::root::Root;
use crate::trace::Trace;

/// Counts of what one call to [`Forest::append`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendReport {
    pub roots_created: usize,
    pub attached: usize,
    pub duplicates: usize,
    pub orphans: usize,
}

enum Placement {
    Root,
    Child,
    Duplicate,
    Orphan(EventRecord),
}

/// All roots built from the events seen so far, one per context.
///
/// Roots are only ever appended to. Events whose `triggeredid` does not
/// resolve are parked as orphans and retried on the next append.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    roots: Vec<Root>,
    by_context: HashMap<String, usize>,
    known: HashMap<String, String>,
    orphans: Vec<EventRecord>,
}

impl Forest {
    pub fn build(events: Vec<EventRecord>) -> Self {
        let mut forest = Self::default();
        forest.append(events);
        forest
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    pub fn root(&self, keptn_context: &str) -> Option<&Root> {
        self.by_context
            .get(keptn_context)
            .and_then(|pos| self.roots.get(*pos))
    }

    pub fn orphans(&self) -> &[EventRecord] {
        &self.orphans
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.known.contains_key(event_id)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Attaches newly fetched events in time order. Ids that are already
    /// known are skipped, so re-applying the same page changes nothing.
    pub fn append(&mut self, events: Vec<EventRecord>) -> AppendReport {
        let mut report = AppendReport::default();
        let mut pending = std::mem::take(&mut self.orphans);
        let mut parked: HashSet<String> =
            pending.iter().map(|event| event.id.clone()).collect();
        for event in events {
            if parked.insert(event.id.clone()) {
                pending.push(event);
            } else {
                report.duplicates += 1;
            }
        }
        pending.sort_by(|a, b| a.time.cmp(&b.time));

        for event in pending {
            match self.place(event) {
                Placement::Root => report.roots_created += 1,
                Placement::Child => report.attached += 1,
                Placement::Duplicate => report.duplicates += 1,
                Placement::Orphan(event) => {
                    tracing::debug!(
                        event_id = %event.id,
                        triggeredid = event.triggeredid.as_deref().unwrap_or(""),
                        "event parent not known yet"
                    );
                    self.orphans.push(event);
                }
            }
        }
        report.orphans = self.orphans.len();
        report
    }

    fn place(&mut self, event: EventRecord) -> Placement {
        if self.known.contains_key(&event.id) {
            return Placement::Duplicate;
        }
        let context = event.shkeptncontext.clone();
        let Some(parent_id) = event.triggeredid.clone() else {
            return match self.by_context.get(&context).copied() {
                Some(pos) => {
                    self.known.insert(event.id.clone(), context);
                    self.roots[pos].trace_mut().traces.push(Trace::new(event));
                    Placement::Child
                }
                None => {
                    self.known.insert(event.id.clone(), context.clone());
                    self.by_context.insert(context, self.roots.len());
                    self.roots.push(Root::new(event));
                    Placement::Root
                }
            };
        };

        if self.known.get(&parent_id) != Some(&context) {
            return Placement::Orphan(event);
        }
        let Some(pos) = self.by_context.get(&context).copied() else {
            return Placement::Orphan(event);
        };
        let Some(parent) = self.roots[pos].trace_mut().find_trace_mut(&parent_id) else {
            return Placement::Orphan(event);
        };
        self.known.insert(event.id.clone(), context);
        attach_to(parent, event);
        Placement::Child
    }
}

/// A `finished` answer goes under the first `started` sibling for the same
/// trigger that is still open, collapsing the pair into one step.
fn attach_to(parent: &mut Trace, event: EventRecord) {
    if event.kind().is_finished() {
        let parent_id = parent.event.id.clone();
        let open_start = parent.traces.iter_mut().find(|child| {
            child.kind().is_started()
                && child.event.triggeredid.as_deref() == Some(parent_id.as_str())
                && !child.traces.iter().any(|t| t.kind().is_finished())
        });
        if let Some(started) = open_start {
            started.traces.push(Trace::new(event));
            return;
        }
    }
    parent.traces.push(Trace::new(event));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceStatus;
    use bridge_types::{EventResult, EventStatus};
    use chrono::{Duration, TimeZone, Utc};

    fn event(id: &str, kind: &str, minute: i64, context: &str) -> EventRecord {
        let base = Utc.with_ymd_and_hms(2021, 5, 10, 9, 0, 0).unwrap();
        EventRecord::new(id, kind, base + Duration::minutes(minute), context).with_stage("dev")
    }

    fn delivery(context: &str) -> Vec<EventRecord> {
        vec![
            event("r", "sh.keptn.event.dev.delivery.triggered", 0, context),
            event("d", "sh.keptn.event.deployment.triggered", 1, context),
            event("d-s", "sh.keptn.event.deployment.started", 2, context).with_triggeredid("d"),
            event("d-f", "sh.keptn.event.deployment.finished", 3, context)
                .with_triggeredid("d")
                .with_result(EventResult::Pass)
                .with_status(EventStatus::Succeeded),
        ]
    }

    #[test]
    fn builds_one_root_per_context_and_collapses_start_finish() {
        let mut events = delivery("ctx-1");
        events.reverse();
        let forest = Forest::build(events);
        assert_eq!(forest.len(), 1);

        let root = forest.root("ctx-1").unwrap();
        assert_eq!(root.id(), "r");
        assert_eq!(root.traces.len(), 1);
        let deployment = &root.traces[0];
        assert_eq!(deployment.traces.len(), 1);
        assert_eq!(deployment.traces[0].traces[0].id(), "d-f");
        assert!(root.is_finished());
        assert_eq!(root.status(), TraceStatus::Succeeded);
    }

    #[test]
    fn progress_updates_keep_the_root_active_until_finished() {
        let mut forest = Forest::build(vec![
            event("r", "sh.keptn.event.dev.delivery.triggered", 0, "ctx-1"),
            event("d", "sh.keptn.event.deployment.triggered", 1, "ctx-1"),
            event("d-c", "sh.keptn.event.deployment.status.changed", 2, "ctx-1")
                .with_triggeredid("d"),
        ]);
        let root = forest.root("ctx-1").unwrap();
        assert!(!root.traces[0].is_finished());
        assert_eq!(root.status(), TraceStatus::Active);

        forest.append(vec![
            event("d-f", "sh.keptn.event.deployment.finished", 3, "ctx-1")
                .with_triggeredid("d")
                .with_result(EventResult::Pass),
        ]);
        let root = forest.root("ctx-1").unwrap();
        assert!(root.is_finished());
        assert_eq!(root.status(), TraceStatus::Succeeded);
    }

    #[test]
    fn appending_the_same_page_twice_is_idempotent() {
        let mut forest = Forest::build(delivery("ctx-1"));
        let before = forest.root("ctx-1").cloned();
        let report = forest.append(delivery("ctx-1"));
        assert_eq!(report.duplicates, 4);
        assert_eq!(report.attached, 0);
        assert_eq!(forest.root("ctx-1").cloned(), before);
    }

    #[test]
    fn unknown_parents_become_orphans_until_resolved() {
        let mut forest = Forest::build(vec![event(
            "r",
            "sh.keptn.event.dev.delivery.triggered",
            0,
            "ctx-1",
        )]);
        let report = forest.append(vec![
            event("x-f", "sh.keptn.event.test.finished", 5, "ctx-1").with_triggeredid("x"),
        ]);
        assert_eq!(report.orphans, 1);
        assert!(!forest.contains("x-f"));
        assert_eq!(forest.root("ctx-1").unwrap().traces.len(), 0);

        let report = forest.append(vec![event("x", "sh.keptn.event.test.triggered", 4, "ctx-1")]);
        assert_eq!(report.orphans, 0);
        assert!(forest.contains("x-f"));
        assert_eq!(forest.root("ctx-1").unwrap().traces[0].traces[0].id(), "x-f");
    }

    #[test]
    fn refetching_a_page_with_an_orphan_parks_it_once() {
        let page = vec![
            event("r", "sh.keptn.event.dev.delivery.triggered", 0, "ctx-1"),
            event("x-f", "sh.keptn.event.test.finished", 5, "ctx-1").with_triggeredid("x"),
        ];
        let mut forest = Forest::build(page.clone());
        for _ in 0..5 {
            let report = forest.append(page.clone());
            assert_eq!(report.orphans, 1);
            assert_eq!(report.duplicates, 2);
        }
        assert_eq!(forest.orphans().len(), 1);

        let mut twice_in_one_page = page.clone();
        twice_in_one_page.extend(page);
        let forest = Forest::build(twice_in_one_page);
        assert_eq!(forest.orphans().len(), 1);
    }

    #[test]
    fn parents_from_another_context_are_not_followed() {
        let mut events = delivery("ctx-1");
        events.push(event("y", "sh.keptn.event.dev.delivery.triggered", 0, "ctx-2"));
        events.push(
            event("y-f", "sh.keptn.event.dev.delivery.finished", 9, "ctx-2").with_triggeredid("d"),
        );
        let forest = Forest::build(events);
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.orphans().len(), 1);
        assert_eq!(forest.orphans()[0].id, "y-f");
    }
}
