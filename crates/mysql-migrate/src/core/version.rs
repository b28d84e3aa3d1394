//! Server version records.
//!
//! Versions are totally ordered through a normalized integer
//! `major * 10000 + minor * 100 + max(0, release)`. The build number and the
//! descriptive name never take part in comparisons.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{MigrateError, Result};

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+\.\d+(\.\d+)*).*$").expect("version pattern is valid")
});

/// MySQL release series the engine knows how to target.
pub const SUPPORTED_MYSQL_SERIES: &[(i32, i32)] = &[(5, 1), (5, 5), (5, 6), (5, 7), (8, 0)];

/// A database server version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub major: i32,
    pub minor: i32,
    /// Release number, `-1` when unknown.
    #[serde(default = "unknown_part")]
    pub release: i32,
    /// Build number, `-1` when unknown.
    #[serde(default = "unknown_part")]
    pub build: i32,
    /// Free-form label (e.g. the server's own version string).
    #[serde(default)]
    pub name: String,
}

fn unknown_part() -> i32 {
    -1
}

impl Version {
    pub fn new(major: i32, minor: i32, release: i32) -> Self {
        Self {
            major,
            minor,
            release,
            build: 0,
            name: String::new(),
        }
    }

    pub fn with_build(mut self, build: i32) -> Self {
        self.build = build;
        self
    }

    /// Version used when neither the caller nor the source dictates one.
    pub fn default_target() -> Self {
        Self::new(5, 5, 0)
    }

    /// Parse a dotted version string. Anything after the numeric prefix is
    /// ignored, so `"5.6.10-log"` parses as 5.6.10.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = VERSION_PATTERN.captures(text.trim())?;
        let numeric = caps.get(1)?.as_str();
        let parts: Vec<i32> = numeric
            .split('.')
            .map(|p| p.parse::<i32>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;

        Some(Self {
            major: parts[0],
            minor: parts[1],
            release: parts.get(2).copied().unwrap_or(-1),
            build: parts.get(3).copied().unwrap_or(-1),
            name: text.trim().to_string(),
        })
    }

    pub fn normalized(&self) -> i64 {
        self.major as i64 * 10000 + self.minor as i64 * 100 + self.release.max(0) as i64
    }

    pub fn is_at_least(&self, major: i32, minor: i32, release: i32) -> bool {
        self.normalized() >= Version::new(major, minor, release).normalized()
    }

    /// True for the whitelisted MySQL release series.
    pub fn is_supported_mysql(&self) -> bool {
        SUPPORTED_MYSQL_SERIES
            .iter()
            .any(|&(major, minor)| self.major == major && self.minor == minor)
    }

    /// Capability gate: a supported MySQL series at or above the given version.
    pub fn is_supported_mysql_version_at_least(&self, major: i32, minor: i32, release: i32) -> bool {
        self.is_supported_mysql() && self.is_at_least(major, minor, release)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::default_target()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if self.release >= 0 {
            write!(f, ".{}", self.release)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
            .ok_or_else(|| MigrateError::Config(format!("invalid version string '{}'", s)))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized().cmp(&other.normalized())
    }
}

impl PartialEq<&str> for Version {
    fn eq(&self, other: &&str) -> bool {
        Version::parse(other).is_some_and(|v| *self == v)
    }
}

impl PartialOrd<&str> for Version {
    fn partial_cmp(&self, other: &&str) -> Option<Ordering> {
        Version::parse(other).map(|v| self.cmp(&v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_and_partial() {
        let v = Version::parse("5.6.10-log").unwrap();
        assert_eq!((v.major, v.minor, v.release, v.build), (5, 6, 10, -1));

        let v = Version::parse("8.0").unwrap();
        assert_eq!(v.release, -1);
        assert_eq!(v.normalized(), 80000);

        let v = Version::parse("10.0.1.4200").unwrap();
        assert_eq!(v.build, 4200);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Version::parse("five").is_none());
        assert!(Version::parse("5").is_none());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_ordering_uses_normalized_value() {
        assert!(Version::new(5, 6, 4) > Version::new(5, 5, 40));
        assert!(Version::new(5, 10, 0) > Version::new(5, 6, 99));
        assert_eq!(Version::new(5, 6, -1), Version::new(5, 6, 0));
        assert_eq!(Version::new(5, 6, 0).with_build(12), Version::new(5, 6, 0));
    }

    #[test]
    fn test_compare_with_strings() {
        let v = Version::new(5, 6, 10);
        assert!(v > "5.6.4");
        assert!(v < "5.7");
        assert!(v == "5.6.10-enterprise");
        assert_eq!(v.partial_cmp(&"not a version"), None);
    }

    #[test]
    fn test_supported_mysql() {
        assert!(Version::new(5, 1, 73).is_supported_mysql());
        assert!(Version::new(8, 0, 30).is_supported_mysql());
        assert!(!Version::new(5, 0, 96).is_supported_mysql());
        assert!(!Version::new(9, 1, 0).is_supported_mysql());

        assert!(Version::new(5, 6, 10).is_supported_mysql_version_at_least(5, 6, 4));
        assert!(!Version::new(5, 6, 2).is_supported_mysql_version_at_least(5, 6, 4));
        assert!(!Version::new(9, 1, 0).is_supported_mysql_version_at_least(5, 5, 0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Version::new(5, 5, 0).to_string(), "5.5.0");
        assert_eq!(Version::parse("8.0").unwrap().to_string(), "8.0");
    }
}
