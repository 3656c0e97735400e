use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

/// Tier of difference between two version strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
    /// Versions differ but carry no comparable numeric components
    Unknown,
}

static NUMERIC_COMPONENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Strips a leading `v`/`V` and pads partial versions with zeros.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Leading `major.minor.patch` numbers found anywhere in the string
fn numeric_components(version: &str) -> Option<(u64, u64, u64)> {
    let caps = NUMERIC_COMPONENTS.captures(version)?;
    let part = |i: usize| {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    Some((part(1), part(2), part(3)))
}

/// Classify the difference between two version strings.
///
/// Returns `None` when the versions are identical. Versions that aren't valid
/// semver fall back to their leading numeric components (e.g. `release-2024.01`).
pub fn version_bump(old: &str, new: &str) -> Option<VersionBump> {
    if old == new {
        return None;
    }

    let components = match (parse_version(old), parse_version(new)) {
        (Some(o), Some(n)) => Some(((o.major, o.minor, o.patch), (n.major, n.minor, n.patch))),
        _ => numeric_components(old).zip(numeric_components(new)),
    };

    let Some(((old_major, old_minor, _), (new_major, new_minor, _))) = components else {
        return Some(VersionBump::Unknown);
    };

    if old_major != new_major {
        Some(VersionBump::Major)
    } else if old_minor != new_minor {
        Some(VersionBump::Minor)
    } else {
        Some(VersionBump::Patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Some(Version::new(1, 0, 0)))]
    #[case("1.2", Some(Version::new(1, 2, 0)))]
    #[case("v1.2.3", Some(Version::new(1, 2, 3)))]
    #[case("V2.0", Some(Version::new(2, 0, 0)))]
    #[case("invalid", None)]
    fn parse_version_normalizes_partial_versions(
        #[case] input: &str,
        #[case] expected: Option<Version>,
    ) {
        assert_eq!(parse_version(input), expected);
    }

    #[rstest]
    #[case("1.0.0", "1.0.0", None)]
    #[case("1.0.0", "2.0.0", Some(VersionBump::Major))]
    #[case("1.0.0", "1.1.0", Some(VersionBump::Minor))]
    #[case("1.0.0", "1.0.1", Some(VersionBump::Patch))]
    #[case("v1.2.3", "1.2.4", Some(VersionBump::Patch))]
    #[case("1.0.0", "1.0.0-beta.1", Some(VersionBump::Patch))]
    #[case("release-2023.10", "release-2024.01", Some(VersionBump::Major))]
    #[case("build 7.1", "build 7.2", Some(VersionBump::Minor))]
    #[case("unknown", "latest", Some(VersionBump::Unknown))]
    #[case("unknown", "1.0.0", Some(VersionBump::Unknown))]
    fn version_bump_classifies_differences(
        #[case] old: &str,
        #[case] new: &str,
        #[case] expected: Option<VersionBump>,
    ) {
        assert_eq!(version_bump(old, new), expected);
    }
}
