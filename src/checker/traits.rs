//! Checker trait for fetching and diffing remote resource state

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::checker::comparator::compare_snapshots;
use crate::checker::error::CheckError;
use crate::checker::rate_limit::RateLimitStatus;
use crate::checker::types::{AccessConfig, ChangeDetection, DependencySnapshot};

/// Declared identity of a checker plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerMetadata {
    pub name: String,
    pub version: String,
    pub access_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CheckerMetadata {
    pub fn new(name: &str, version: &str, access_method: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            access_method: access_method.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Strategy for one access method: fetch a snapshot, diff two snapshots
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Declared plugin metadata
    fn metadata(&self) -> CheckerMetadata;

    /// Access method this checker handles
    fn access_method(&self) -> String {
        self.metadata().access_method
    }

    /// Fetch the current state of the resource
    ///
    /// # Returns
    /// * `Ok(DependencySnapshot)` - A complete snapshot
    /// * `Err(CheckError)` - If the fetch or parse fails; never a partial snapshot
    async fn fetch(&self, config: &AccessConfig) -> Result<DependencySnapshot, CheckError>;

    /// Diff a previous snapshot against a current one without I/O.
    ///
    /// Defaults to hash/version equality.
    fn compare(
        &self,
        previous: &DependencySnapshot,
        current: &DependencySnapshot,
    ) -> ChangeDetection {
        compare_snapshots(previous, current)
    }

    /// Called by the loader after validation when auto-initialization is enabled
    fn initialize(&self) -> Result<(), CheckError> {
        Ok(())
    }

    /// Called by the registry before the checker is unregistered
    fn teardown(&self) {}

    /// Advisory quota state for the remote host, if the checker tracks one
    fn rate_limit_status(&self, _now: DateTime<Utc>) -> Option<RateLimitStatus> {
        None
    }
}
