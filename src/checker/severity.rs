//! Severity classification for detected changes

use crate::checker::semver::{VersionBump, version_bump};
use crate::checker::types::{ChangeDetection, ChangeKind, Severity};

fn has_removals_or_incompatibilities(detection: &ChangeDetection) -> bool {
    let flagged = detection.has(ChangeKind::EndpointsRemoved)
        || detection.has(ChangeKind::SchemasRemoved)
        || detection.has(ChangeKind::SchemasIncompatible);

    let in_diff = detection.diff.as_ref().is_some_and(|diff| {
        !diff.endpoints.removed.is_empty()
            || !diff.schemas.removed.is_empty()
            || !diff.incompatible_schemas.is_empty()
    });

    flagged || in_diff
}

fn has_modifications(detection: &ChangeDetection) -> bool {
    let flagged =
        detection.has(ChangeKind::EndpointsModified) || detection.has(ChangeKind::SchemasModified);

    let in_diff = detection.diff.as_ref().is_some_and(|diff| {
        !diff.endpoints.modified.is_empty() || !diff.schemas.modified.is_empty()
    });

    flagged || in_diff
}

fn detected_bump(detection: &ChangeDetection) -> Option<VersionBump> {
    if !detection.has(ChangeKind::Version) {
        return None;
    }
    match (&detection.old_version, &detection.new_version) {
        (Some(old), Some(new)) => version_bump(old, new),
        _ => Some(VersionBump::Unknown),
    }
}

/// Classify the impact of a detection.
///
/// Rules, first match wins:
/// 1. removed endpoint/schema or incompatible schema -> breaking
/// 2. major version component changed -> breaking
/// 3. modified endpoint/schema or minor version component changed -> major
/// 4. anything else -> minor
///
/// Unchanged detections classify as `Minor`; callers decide whether to report it.
pub fn classify(detection: &ChangeDetection) -> Severity {
    if !detection.has_changed {
        return Severity::Minor;
    }

    let bump = detected_bump(detection);

    if has_removals_or_incompatibilities(detection) || bump == Some(VersionBump::Major) {
        return Severity::Breaking;
    }

    if has_modifications(detection) || bump == Some(VersionBump::Minor) {
        return Severity::Major;
    }

    Severity::Minor
}
