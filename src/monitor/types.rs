use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::checker::types::{ChangeDetection, DependencySnapshot, SnapshotMetadata};

/// How often a dependency is checked
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Hourly,
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Fixed interval for this frequency (a month is 30 days)
    pub fn interval(self) -> Duration {
        match self {
            Frequency::Hourly => Duration::hours(1),
            Frequency::Daily => Duration::hours(24),
            Frequency::Weekly => Duration::days(7),
            Frequency::Monthly => Duration::days(30),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial monitoring rules, set per dependency or per URL in configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitoringOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_changes: Option<bool>,
}

impl MonitoringOverride {
    /// Whether this override alone excludes the dependency from monitoring
    pub fn excludes(&self) -> bool {
        self.enabled == Some(false) || self.ignore_changes == Some(true)
    }
}

/// Fully resolved monitoring rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitoringRules {
    pub enabled: bool,
    pub frequency: Frequency,
    pub ignore_changes: bool,
}

impl MonitoringRules {
    /// Apply the fields present in `overrides` on top of these rules
    pub fn merge(&self, overrides: &MonitoringOverride) -> Self {
        Self {
            enabled: overrides.enabled.unwrap_or(self.enabled),
            frequency: overrides.frequency.unwrap_or(self.frequency),
            ignore_changes: overrides.ignore_changes.unwrap_or(self.ignore_changes),
        }
    }

    /// Whether these rules let the dependency be checked at all
    pub fn is_active(&self) -> bool {
        self.enabled && !self.ignore_changes
    }
}

impl Default for MonitoringRules {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: Frequency::Daily,
            ignore_changes: false,
        }
    }
}

/// A tracked remote resource, as recorded in the dependency manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub id: String,
    pub url: String,
    pub access_method: String,
    pub current_state_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<MonitoringOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_metadata: Option<SnapshotMetadata>,
}

impl Dependency {
    pub fn new(id: &str, url: &str, access_method: &str, current_state_hash: &str) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            access_method: access_method.to_string(),
            current_state_hash: current_state_hash.to_string(),
            current_version: None,
            last_checked: None,
            monitoring: None,
            current_metadata: None,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.current_version = Some(version.to_string());
        self
    }

    pub fn with_last_checked(mut self, last_checked: DateTime<Utc>) -> Self {
        self.last_checked = Some(last_checked);
        self
    }

    pub fn with_monitoring(mut self, monitoring: MonitoringOverride) -> Self {
        self.monitoring = Some(monitoring);
        self
    }

    pub fn with_metadata(mut self, metadata: SnapshotMetadata) -> Self {
        self.current_metadata = Some(metadata);
        self
    }

    /// Snapshot rebuilt from the persisted manifest fields
    pub fn previous_snapshot(&self) -> DependencySnapshot {
        DependencySnapshot::new(
            self.current_state_hash.clone(),
            self.current_version.clone(),
        )
        .with_metadata(self.current_metadata.clone().unwrap_or_default())
        .with_fetched_at(self.last_checked.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
    }
}

/// How a single check ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The fetch succeeded and produced a new snapshot
    Snapshot(DependencySnapshot),
    /// The check failed; the message is reported verbatim
    Error(String),
}

/// Result of checking one dependency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub dependency: Dependency,
    pub has_changed: bool,
    pub detection: ChangeDetection,
    pub outcome: CheckOutcome,
}

impl CheckResult {
    pub fn success(
        dependency: Dependency,
        detection: ChangeDetection,
        snapshot: DependencySnapshot,
    ) -> Self {
        Self {
            dependency,
            has_changed: detection.has_changed,
            detection,
            outcome: CheckOutcome::Snapshot(snapshot),
        }
    }

    pub fn failure(dependency: Dependency, error: impl Into<String>) -> Self {
        Self {
            dependency,
            has_changed: false,
            detection: ChangeDetection::unchanged(),
            outcome: CheckOutcome::Error(error.into()),
        }
    }

    pub fn new_snapshot(&self) -> Option<&DependencySnapshot> {
        match &self.outcome {
            CheckOutcome::Snapshot(snapshot) => Some(snapshot),
            CheckOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            CheckOutcome::Snapshot(_) => None,
            CheckOutcome::Error(message) => Some(message),
        }
    }
}
