//! Version ordering for the compatibility resolver.

use std::cmp::Ordering;
use std::str::FromStr;

use semver::Version;

/// How "highest version" is decided among compatible installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionOrder {
    /// Plain string comparison. Misorders multi-digit components
    /// (`"4.10" < "4.9"`) but matches what existing installs were chosen with.
    #[default]
    Lexical,
    /// Component-wise numeric comparison.
    Numeric,
}

impl VersionOrder {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            VersionOrder::Lexical => a.cmp(b),
            VersionOrder::Numeric => match (parse_version_lenient(a), parse_version_lenient(b)) {
                (Some(va), Some(vb)) => va.cmp(&vb),
                _ => a.cmp(b),
            },
        }
    }
}

impl FromStr for VersionOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexical" | "string" => Ok(VersionOrder::Lexical),
            "numeric" | "semver" => Ok(VersionOrder::Numeric),
            _ => Err(format!(
                "invalid version order '{}'; expected 'lexical' or 'numeric'",
                s
            )),
        }
    }
}

/// Numeric major component of a dotted version.
pub fn major(version: &str) -> Option<u64> {
    version.split('.').next()?.trim().parse().ok()
}

/// Parse a version string, allowing for incomplete versions.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    if let Ok(v) = s.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = s.split('.').collect();
    match parts.len() {
        1 => {
            let major: u64 = parts[0].parse().ok()?;
            Some(Version::new(major, 0, 0))
        }
        2 => {
            let major: u64 = parts[0].parse().ok()?;
            let minor: u64 = parts[1].parse().ok()?;
            Some(Version::new(major, minor, 0))
        }
        _ => None,
    }
}
