//! Runs checks for manifest dependencies
//!
//! Each check resolves a checker by access method, fetches a fresh snapshot,
//! diffs it against the snapshot rebuilt from the manifest, and classifies
//! the change. Failures never escape a single check.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::checker::error::{CheckError, RegistryError};
use crate::checker::registry::{CheckerRegistry, default_registry_snapshot};
use crate::checker::severity::classify;
use crate::checker::types::{AccessConfig, Auth, ChangeDetection, DependencySnapshot};
use crate::config::MonitorConfig;
use crate::monitor::scheduler::{is_monitoring_enabled, should_check};
use crate::monitor::types::{CheckResult, Dependency};

/// Start delay for the `index`-th check of a batch
fn stagger_delay(stagger_ms: u64, index: usize) -> Duration {
    Duration::from_millis(stagger_ms.saturating_mul(index as u64))
}

/// Checks dependencies against a registry of checkers
pub struct Monitor {
    registry: CheckerRegistry,
    config: MonitorConfig,
    auth: HashMap<String, Auth>,
}

impl Monitor {
    pub fn new(registry: CheckerRegistry, config: MonitorConfig) -> Self {
        Self {
            registry,
            config,
            auth: HashMap::new(),
        }
    }

    /// Create a monitor using a copy of the process-wide registry
    pub fn with_default_registry(config: MonitorConfig) -> Result<Self, RegistryError> {
        Ok(Self::new(default_registry_snapshot()?, config))
    }

    /// Attach credentials used for every dependency with `access_method`
    pub fn with_auth(mut self, access_method: &str, auth: Auth) -> Self {
        self.auth.insert(access_method.to_string(), auth);
        self
    }

    pub fn registry(&self) -> &CheckerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    async fn run_check(
        &self,
        dependency: &Dependency,
    ) -> Result<(ChangeDetection, DependencySnapshot), CheckError> {
        let checker = self
            .registry
            .get(&dependency.access_method)
            .ok_or_else(|| CheckError::UnsupportedAccessMethod(dependency.access_method.clone()))?;

        let mut access = AccessConfig::new(&dependency.url, &dependency.access_method);
        if let Some(auth) = self.auth.get(&dependency.access_method) {
            access = access.with_auth(auth.clone());
        }

        let current = checker.fetch(&access).await?;
        let previous = dependency.previous_snapshot();

        let mut detection = checker.compare(&previous, &current);
        if detection.has_changed {
            detection.severity = Some(classify(&detection));
        }

        Ok((detection, current))
    }

    /// Check a single dependency
    ///
    /// Always returns a result; failures are reported in its error field.
    pub async fn check_dependency(&self, dependency: &Dependency) -> CheckResult {
        match self.run_check(dependency).await {
            Ok((detection, snapshot)) => {
                if detection.has_changed {
                    info!(
                        "{} changed: {:?} ({})",
                        dependency.id,
                        detection.changes,
                        detection
                            .severity
                            .map(|s| s.to_string())
                            .unwrap_or_default()
                    );
                } else {
                    info!("{} unchanged", dependency.id);
                }
                CheckResult::success(dependency.clone(), detection, snapshot)
            }
            Err(e) => {
                error!("Check failed for {}: {}", dependency.id, e);
                CheckResult::failure(dependency.clone(), e.to_string())
            }
        }
    }

    /// Warn when a checker reports too little quota for this batch.
    fn warn_on_rate_limits(&self, dependencies: &[&Dependency], now: DateTime<Utc>) {
        let mut per_method: BTreeMap<&str, u64> = BTreeMap::new();
        for dependency in dependencies {
            *per_method.entry(dependency.access_method.as_str()).or_insert(0) += 1;
        }

        for (access_method, count) in per_method {
            let Some(status) = self
                .registry
                .get(access_method)
                .and_then(|checker| checker.rate_limit_status(now))
            else {
                continue;
            };

            if !status.can_proceed {
                warn!(
                    "Rate limit exhausted for {} (retry in {}s); checks may fail",
                    access_method,
                    status.wait.map(|w| w.num_seconds()).unwrap_or_default()
                );
            } else if status.remaining.is_some_and(|remaining| remaining < count) {
                warn!(
                    "Rate limit for {} has {} requests left for {} checks",
                    access_method,
                    status.remaining.unwrap_or_default(),
                    count
                );
            }
        }
    }

    /// Check every monitored dependency concurrently
    ///
    /// Dependencies with monitoring disabled or ignored are skipped. Returns one
    /// result per remaining dependency, in input order. Checks start staggered
    /// by `fetch.staggerDelayMs`.
    pub async fn check_all(&self, dependencies: &[Dependency]) -> Vec<CheckResult> {
        let eligible: Vec<&Dependency> = dependencies
            .iter()
            .filter(|dependency| {
                let enabled = is_monitoring_enabled(dependency, &self.config);
                if !enabled {
                    debug!("Skipping {}: monitoring disabled", dependency.id);
                }
                enabled
            })
            .collect();

        self.warn_on_rate_limits(&eligible, Utc::now());

        let stagger = self.config.fetch.stagger_delay_ms;
        let futures = eligible.into_iter().enumerate().map(|(i, dependency)| {
            let delay = stagger_delay(stagger, i);
            async move {
                sleep(delay).await;
                self.check_dependency(dependency).await
            }
        });

        join_all(futures).await
    }

    /// Check only the dependencies that are due at `now`
    pub async fn check_due(
        &self,
        dependencies: &[Dependency],
        now: DateTime<Utc>,
    ) -> Vec<CheckResult> {
        let due: Vec<Dependency> = dependencies
            .iter()
            .filter(|dependency| should_check(dependency, &self.config, now))
            .cloned()
            .collect();

        info!("{} of {} dependencies due", due.len(), dependencies.len());
        self.check_all(&due).await
    }
}
