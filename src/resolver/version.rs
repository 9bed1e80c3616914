//! Version comparison for conflict resolution.

use std::cmp::Ordering;

use semver::Version;

/// Parse a version string, allowing for incomplete versions.
///
/// `1` and `1.2` are read as `1.0.0` and `1.2.0`. A qualifier after the
/// numeric part (`1.7.0-RC`, `2.0-beta1`) becomes a pre-release.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    let s = s.trim().trim_start_matches('v');
    if let Ok(v) = Version::parse(s) {
        return Some(v);
    }

    let (numbers, qualifier) = match s.split_once('-') {
        Some((numbers, qualifier)) => (numbers, Some(qualifier)),
        None => (s, None),
    };

    let parts = numbers
        .split('.')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;

    let padded = match parts.as_slice() {
        [major] => format!("{}.0.0", major),
        [major, minor] => format!("{}.{}.0", major, minor),
        _ => return None,
    };

    let full = match qualifier {
        Some(q) => format!("{}-{}", padded, q),
        None => padded,
    };
    Version::parse(&full).ok()
}

/// Compare two version strings.
///
/// Returns `None` when either side is not a recognizable version; callers
/// must then decide without an ordering.
pub fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = parse_version_lenient(a)?;
    let b = parse_version_lenient(b)?;
    Some(a.cmp(&b))
}
