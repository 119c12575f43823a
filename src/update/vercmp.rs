//! Dotted-numeric version comparison with partial-version padding

use std::cmp::Ordering;

use semver::Version;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    Latest,
    Outdated,
    Newer,
    Invalid,
}

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.9" by padding with zeros, and
/// strips a leading 'v' prefix.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "1.9" -> Version(1, 9, 0)
/// - "v1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Compare an installed version against an available one.
pub fn compare_versions(installed: &str, available: &str) -> CompareResult {
    let (Some(installed), Some(available)) = (parse_version(installed), parse_version(available))
    else {
        return CompareResult::Invalid;
    };

    match installed.cmp(&available) {
        Ordering::Equal => CompareResult::Latest,
        Ordering::Less => CompareResult::Outdated,
        Ordering::Greater => CompareResult::Newer,
    }
}

/// Inclusive platform-floor check: `floor <= platform`.
///
/// A missing, empty, or unparseable floor never blocks an update.
pub fn floor_satisfied(floor: Option<&str>, platform: &str) -> bool {
    let Some(floor) = floor.map(str::trim).filter(|f| !f.is_empty()) else {
        return true;
    };

    match (parse_version(floor), parse_version(platform)) {
        (Some(floor), Some(platform)) => floor <= platform,
        _ => true,
    }
}
