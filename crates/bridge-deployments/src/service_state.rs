use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deployment::Deployment;

pub const UNKNOWN_IMAGE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentStage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

/// Where one version of a service has been deployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDeploymentInformation {
    pub keptn_context: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub stages: Vec<DeploymentStage>,
    /// Resolved on the client and never part of a snapshot.
    #[serde(skip)]
    pub deployment: Option<Deployment>,
}

impl ServiceDeploymentInformation {
    pub fn latest_stage_time(&self) -> Option<DateTime<Utc>> {
        self.stages.iter().filter_map(|stage| stage.time).max()
    }

    pub fn image_reference(&self) -> Option<String> {
        let image = self.image.as_deref()?;
        Some(match self.version.as_deref() {
            Some(version) => format!("{image}:{version}"),
            None => image.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceState {
    pub name: String,
    #[serde(default)]
    pub deployment_information: Vec<ServiceDeploymentInformation>,
}

impl ServiceState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deployment_information: Vec::new(),
        }
    }

    /// Reconciles the cached service list against a full snapshot: known
    /// services are merged, new ones appended, vanished ones dropped, and the
    /// result is sorted by name. Rendering relies on that order.
    pub fn update_all(cached: &mut Vec<ServiceState>, incoming: Vec<ServiceState>) {
        let incoming_names: Vec<String> = incoming.iter().map(|s| s.name.clone()).collect();
        for service in incoming {
            match cached.iter_mut().find(|c| c.name == service.name) {
                Some(existing) => existing.update(service),
                None => cached.push(service),
            }
        }

        let before = cached.len();
        cached.retain(|service| incoming_names.contains(&service.name));
        if cached.len() != before {
            tracing::debug!(pruned = before - cached.len(), "services removed upstream");
        }
        cached.sort_by(|a, b| locale_compare(&a.name, &b.name));
    }

    /// Merges one service's snapshot. Matching entries only take the
    /// incoming `stages`; everything else on the cached entry is kept.
    pub fn update(&mut self, incoming: ServiceState) {
        let incoming_contexts: Vec<String> = incoming
            .deployment_information
            .iter()
            .map(|info| info.keptn_context.clone())
            .collect();

        for info in incoming.deployment_information {
            match self
                .deployment_information
                .iter_mut()
                .find(|cached| cached.keptn_context == info.keptn_context)
            {
                Some(cached) => cached.stages = info.stages,
                None => self.deployment_information.push(info),
            }
        }
        self.deployment_information
            .retain(|info| incoming_contexts.contains(&info.keptn_context));
    }

    fn latest_information(&self) -> Option<&ServiceDeploymentInformation> {
        self.deployment_information
            .iter()
            .filter_map(|info| info.latest_stage_time().map(|time| (time, info)))
            .max_by_key(|(time, _)| *time)
            .map(|(_, info)| info)
    }

    /// `<image>:<version>` of the most recently deployed entry.
    pub fn latest_image(&self) -> String {
        self.deployment_information
            .iter()
            .filter(|info| info.image.is_some())
            .filter_map(|info| info.latest_stage_time().map(|time| (time, info)))
            .max_by_key(|(time, _)| *time)
            .and_then(|(_, info)| info.image_reference())
            .unwrap_or_else(|| UNKNOWN_IMAGE.to_string())
    }

    pub fn latest_deployment_context(&self) -> Option<&str> {
        self.latest_information()
            .map(|info| info.keptn_context.as_str())
    }

    /// Stage names across all entries, in first-seen order.
    pub fn stages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for stage in self
            .deployment_information
            .iter()
            .flat_map(|info| info.stages.iter())
        {
            if !names.contains(&stage.name.as_str()) {
                names.push(&stage.name);
            }
        }
        names
    }

    pub fn information(&self, keptn_context: &str) -> Option<&ServiceDeploymentInformation> {
        self.deployment_information
            .iter()
            .find(|info| info.keptn_context == keptn_context)
    }

    pub fn information_mut(
        &mut self,
        keptn_context: &str,
    ) -> Option<&mut ServiceDeploymentInformation> {
        self.deployment_information
            .iter_mut()
            .find(|info| info.keptn_context == keptn_context)
    }
}

/// Case-insensitive first, then byte order to keep the sort total.
fn locale_compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
