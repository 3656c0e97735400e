//! Check scheduling
//!
//! [`evaluate`] decides whether a dependency is disabled, due or not yet due;
//! every other function here derives from it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::MonitorConfig;
use crate::monitor::types::{Dependency, Frequency, MonitoringRules};

/// Scheduling state of one dependency at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// Monitoring is disabled or changes are ignored
    Disabled,
    /// The dependency should be checked now
    Due,
    /// The dependency was checked recently
    NotDue { next_check: DateTime<Utc> },
}

/// Aggregate view of the schedule for a set of dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    pub total: usize,
    pub due: usize,
    pub not_due: usize,
    pub disabled: usize,
    /// Effective frequency counts for monitored dependencies
    pub by_frequency: BTreeMap<Frequency, usize>,
    /// Earliest upcoming check among monitored dependencies
    pub next_check: Option<DateTime<Utc>>,
}

/// Defaults merged with the URL-keyed configuration override
fn configured_rules(dependency: &Dependency, config: &MonitorConfig) -> MonitoringRules {
    match config.override_for(&dependency.url) {
        Some(overrides) => config.monitoring.defaults.merge(overrides),
        None => config.monitoring.defaults.clone(),
    }
}

/// Frequency in effect for a dependency; its own override wins over configuration
pub fn effective_frequency(dependency: &Dependency, config: &MonitorConfig) -> Frequency {
    dependency
        .monitoring
        .as_ref()
        .and_then(|m| m.frequency)
        .unwrap_or_else(|| configured_rules(dependency, config).frequency)
}

/// Whether the dependency is monitored at all, ignoring elapsed time
pub fn is_monitoring_enabled(dependency: &Dependency, config: &MonitorConfig) -> bool {
    if dependency.monitoring.as_ref().is_some_and(|m| m.excludes()) {
        return false;
    }

    configured_rules(dependency, config).is_active()
}

/// Decide the scheduling state of `dependency` at `now`
pub fn evaluate(
    dependency: &Dependency,
    config: &MonitorConfig,
    now: DateTime<Utc>,
) -> ScheduleDecision {
    if !is_monitoring_enabled(dependency, config) {
        debug!("{}: monitoring disabled", dependency.id);
        return ScheduleDecision::Disabled;
    }

    let Some(last_checked) = dependency.last_checked else {
        debug!("{}: never checked", dependency.id);
        return ScheduleDecision::Due;
    };

    let interval = effective_frequency(dependency, config).interval();
    let next_check = last_checked + interval;

    if last_checked > now {
        debug!("{}: last checked in the future ({})", dependency.id, last_checked);
        return ScheduleDecision::NotDue { next_check };
    }

    if now - last_checked >= interval {
        ScheduleDecision::Due
    } else {
        debug!("{}: next check at {}", dependency.id, next_check);
        ScheduleDecision::NotDue { next_check }
    }
}

/// Whether `dependency` should be checked at `now`
pub fn should_check(dependency: &Dependency, config: &MonitorConfig, now: DateTime<Utc>) -> bool {
    evaluate(dependency, config, now) == ScheduleDecision::Due
}

/// When `dependency` should next be checked
///
/// # Returns
/// * `None` - Monitoring is disabled
/// * `Some(now)` - The dependency is due (including never checked)
/// * `Some(t)` - The dependency becomes due at `t`
pub fn next_check_time(
    dependency: &Dependency,
    config: &MonitorConfig,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match evaluate(dependency, config, now) {
        ScheduleDecision::Disabled => None,
        ScheduleDecision::Due => Some(now),
        ScheduleDecision::NotDue { next_check } => Some(next_check),
    }
}

/// Summarize the schedule for `dependencies` at `now`
pub fn schedule_summary(
    dependencies: &[Dependency],
    config: &MonitorConfig,
    now: DateTime<Utc>,
) -> ScheduleSummary {
    let mut summary = ScheduleSummary {
        total: dependencies.len(),
        ..Default::default()
    };

    for dependency in dependencies {
        let next = match evaluate(dependency, config, now) {
            ScheduleDecision::Disabled => {
                summary.disabled += 1;
                continue;
            }
            ScheduleDecision::Due => {
                summary.due += 1;
                now
            }
            ScheduleDecision::NotDue { next_check } => {
                summary.not_due += 1;
                next_check
            }
        };

        *summary
            .by_frequency
            .entry(effective_frequency(dependency, config))
            .or_insert(0) += 1;
        summary.next_check = Some(summary.next_check.map_or(next, |current| current.min(next)));
    }

    summary
}
