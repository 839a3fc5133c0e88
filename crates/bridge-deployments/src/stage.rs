use bridge_trace::{summarize, Verdict};
use bridge_types::{EventRecord, EventResult, SequenceState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::remediation::RemediationSummary;

/// One task-run summary within a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSequence {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub sequence_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state: SequenceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<EventResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub has_pending_approval: bool,
}

impl SubSequence {
    pub fn verdict(&self) -> Verdict {
        match self.result {
            Some(EventResult::Fail) => Verdict::Failed,
            Some(EventResult::Warning) => Verdict::Warning,
            Some(EventResult::Pass) => Verdict::Passed,
            _ => Verdict::Undecided,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalInformation {
    pub trace: EventRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployed_image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDeploymentStateInfo {
    pub is_faulty: bool,
    pub is_successful: bool,
    pub is_warning: bool,
    pub is_aborted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDeployment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_time_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sub_sequences: Vec<SubSequence>,
    #[serde(default)]
    pub open_remediations: Vec<RemediationSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_evaluation: Option<EventRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_evaluation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_information: Option<ApprovalInformation>,
    #[serde(rename = "deploymentURL", default, skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
}

impl StageDeployment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_time_updated: None,
            sub_sequences: Vec::new(),
            open_remediations: Vec::new(),
            latest_evaluation: None,
            has_evaluation: None,
            approval_information: None,
            deployment_url: None,
        }
    }

    /// Merges a freshly fetched copy of this stage into the cached one.
    ///
    /// Sub-sequences are unioned by id: a re-reported id takes the incoming
    /// version in place, ids only known to the cache stay, and new ids are
    /// appended. Remediations are always replaced. Optional details only
    /// overwrite the cache when the incoming stage carries them.
    pub fn update(&mut self, incoming: StageDeployment) {
        let mut appended = 0usize;
        let mut replaced = 0usize;
        for sequence in incoming.sub_sequences {
            match self
                .sub_sequences
                .iter_mut()
                .find(|cached| cached.id == sequence.id)
            {
                Some(cached) => {
                    *cached = sequence;
                    replaced += 1;
                }
                None => {
                    self.sub_sequences.push(sequence);
                    appended += 1;
                }
            }
        }

        self.open_remediations = incoming.open_remediations;
        keep_or_replace(&mut self.latest_evaluation, incoming.latest_evaluation);
        keep_or_replace(&mut self.last_time_updated, incoming.last_time_updated);
        keep_or_replace(&mut self.has_evaluation, incoming.has_evaluation);
        keep_or_replace(&mut self.approval_information, incoming.approval_information);
        keep_or_replace(&mut self.deployment_url, incoming.deployment_url);

        tracing::debug!(
            stage = %self.name,
            replaced,
            appended,
            remediations = self.open_remediations.len(),
            "stage deployment merged"
        );
    }

    /// Resolves a pending approval locally, ahead of the next fetch.
    pub fn remove_approval(&mut self) {
        for sequence in &mut self.sub_sequences {
            sequence.has_pending_approval = false;
        }
        self.approval_information = None;
    }

    pub fn has_pending_approval(&self) -> bool {
        self.sub_sequences
            .iter()
            .any(|sequence| sequence.has_pending_approval)
    }

    pub fn last_sub_sequence(&self) -> Option<&SubSequence> {
        self.sub_sequences.last()
    }

    pub fn is_finished(&self) -> bool {
        self.last_sub_sequence()
            .is_some_and(|sequence| sequence.state.is_terminal())
    }

    pub fn state_info(&self) -> StageDeploymentStateInfo {
        let summary = summarize(self.sub_sequences.iter().map(SubSequence::verdict));
        StageDeploymentStateInfo {
            is_faulty: summary.faulty,
            is_successful: summary.successful,
            is_warning: summary.warning,
            is_aborted: self
                .last_sub_sequence()
                .is_some_and(|sequence| sequence.state == SequenceState::Aborted),
        }
    }
}

/// Overwrites `cached` only when the incoming delta supplies a value.
pub(crate) fn keep_or_replace<T>(cached: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *cached = incoming;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn sub(id: &str, state: SequenceState, result: Option<EventResult>) -> SubSequence {
        SubSequence {
            id: id.to_string(),
            name: "delivery".to_string(),
            sequence_type: "sh.keptn.event.dev.delivery.triggered".to_string(),
            time: None,
            state,
            result,
            message: None,
            has_pending_approval: false,
        }
    }

    fn ids(stage: &StageDeployment) -> Vec<&str> {
        stage.sub_sequences.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn sub_sequences_are_unioned_by_id() {
        let mut cached = StageDeployment::new("dev");
        cached.sub_sequences = vec![
            sub("1", SequenceState::Finished, None),
            sub("2", SequenceState::Started, None),
        ];
        let mut incoming = StageDeployment::new("dev");
        incoming.sub_sequences = vec![
            sub("2", SequenceState::Finished, Some(EventResult::Pass)),
            sub("3", SequenceState::Triggered, None),
        ];

        cached.update(incoming);
        assert_eq!(ids(&cached), vec!["1", "2", "3"]);
        assert_eq!(cached.sub_sequences[1].state, SequenceState::Finished);
        assert_eq!(cached.sub_sequences[1].result, Some(EventResult::Pass));
    }

    #[test]
    fn absent_details_do_not_erase_cached_values() {
        let time = Utc.with_ymd_and_hms(2021, 5, 10, 9, 0, 0).unwrap();
        let evaluation = EventRecord::new("ev", "sh.keptn.event.evaluation.finished", time, "ctx");
        let mut cached = StageDeployment::new("dev");
        cached.latest_evaluation = Some(evaluation.clone());
        cached.last_time_updated = Some(time);
        cached.has_evaluation = Some(true);
        cached.deployment_url = Some("http://carts.dev".to_string());

        cached.update(StageDeployment::new("dev"));
        assert_eq!(cached.latest_evaluation, Some(evaluation));
        assert_eq!(cached.last_time_updated, Some(time));
        assert_eq!(cached.has_evaluation, Some(true));
        assert_eq!(cached.deployment_url.as_deref(), Some("http://carts.dev"));

        let mut fresher = StageDeployment::new("dev");
        fresher.has_evaluation = Some(false);
        cached.update(fresher);
        assert_eq!(cached.has_evaluation, Some(false));
    }

    #[test]
    fn remediations_are_replaced_outright() {
        let mut cached = StageDeployment::new("dev");
        cached.open_remediations = vec![RemediationSummary::new("r-1", "remediation")];
        cached.update(StageDeployment::new("dev"));
        assert!(cached.open_remediations.is_empty());
    }

    #[test]
    fn merging_the_same_stage_twice_is_idempotent() {
        let mut incoming = StageDeployment::new("dev");
        incoming.sub_sequences = vec![
            sub("2", SequenceState::Finished, None),
            sub("3", SequenceState::Started, None),
        ];
        let mut once = StageDeployment::new("dev");
        once.sub_sequences = vec![sub("1", SequenceState::Finished, None)];
        once.update(incoming.clone());
        let mut twice = once.clone();
        twice.update(incoming);
        assert_eq!(once, twice);
    }

    #[test]
    fn state_info_follows_last_decisive_result() {
        let mut stage = StageDeployment::new("dev");
        stage.sub_sequences = vec![
            sub("1", SequenceState::Finished, Some(EventResult::Pass)),
            sub("2", SequenceState::Finished, Some(EventResult::Fail)),
        ];
        let info = stage.state_info();
        assert!(info.is_faulty && !info.is_successful);

        stage.sub_sequences.push(sub("3", SequenceState::Aborted, Some(EventResult::Warning)));
        let info = stage.state_info();
        assert!(info.is_faulty);
        assert!(info.is_warning);
        assert!(info.is_aborted);

        stage.sub_sequences.push(sub("4", SequenceState::Finished, Some(EventResult::Pass)));
        let info = stage.state_info();
        assert!(!info.is_faulty && info.is_successful && !info.is_aborted);
    }

    #[test]
    fn remove_approval_clears_flags_and_information() {
        let time = Utc.with_ymd_and_hms(2021, 5, 10, 9, 0, 0).unwrap();
        let mut stage = StageDeployment::new("staging");
        let mut waiting = sub("1", SequenceState::Waiting, None);
        waiting.has_pending_approval = true;
        stage.sub_sequences.push(waiting);
        stage.approval_information = Some(ApprovalInformation {
            trace: EventRecord::new("a", "sh.keptn.event.approval.triggered", time, "ctx"),
            deployed_image: Some("carts:0.12.1".to_string()),
        });
        assert!(stage.has_pending_approval());

        stage.remove_approval();
        assert!(!stage.has_pending_approval());
        assert!(stage.approval_information.is_none());
    }
}
