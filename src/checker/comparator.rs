//! Checker-independent snapshot comparison
//!
//! Used by checkers without bespoke diff logic: only the state hash and the
//! version string are considered.

use crate::checker::types::{ChangeDetection, ChangeKind, DependencySnapshot};

/// Compare two snapshots by state hash and version.
///
/// A version appearing or disappearing counts as a version change.
pub fn compare_snapshots(
    previous: &DependencySnapshot,
    current: &DependencySnapshot,
) -> ChangeDetection {
    let mut changes = Vec::new();

    if previous.state_hash != current.state_hash {
        changes.push(ChangeKind::StateHash);
    }

    if previous.version != current.version {
        changes.push(ChangeKind::Version);
    }

    ChangeDetection::from_changes(
        changes,
        previous.version.as_deref(),
        current.version.as_deref(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn snapshot(hash: &str, version: Option<&str>) -> DependencySnapshot {
        DependencySnapshot::new(hash, version.map(str::to_string))
    }

    #[rstest]
    #[case(("a", Some("1.0.0")), ("a", Some("1.0.0")), vec![])]
    #[case(("a", Some("1.0.0")), ("b", Some("1.0.0")), vec![ChangeKind::StateHash])]
    #[case(("a", Some("1.0.0")), ("a", Some("1.1.0")), vec![ChangeKind::Version])]
    #[case(("a", None), ("a", Some("1.0.0")), vec![ChangeKind::Version])]
    #[case(("a", Some("1.0.0")), ("a", None), vec![ChangeKind::Version])]
    #[case(("a", None), ("b", Some("2.0.0")), vec![ChangeKind::StateHash, ChangeKind::Version])]
    fn compare_snapshots_detects_hash_and_version_changes(
        #[case] previous: (&str, Option<&str>),
        #[case] current: (&str, Option<&str>),
        #[case] expected: Vec<ChangeKind>,
    ) {
        let result = compare_snapshots(
            &snapshot(previous.0, previous.1),
            &snapshot(current.0, current.1),
        );

        assert_eq!(result.has_changed, !expected.is_empty());
        assert_eq!(result.changes, expected);
        assert_eq!(result.severity, None);
    }

    #[test]
    fn compare_snapshots_records_versions_when_version_appears() {
        let result = compare_snapshots(&snapshot("a", None), &snapshot("a", Some("1.0.0")));

        assert_eq!(result.old_version, None);
        assert_eq!(result.new_version.as_deref(), Some("1.0.0"));
    }
}
