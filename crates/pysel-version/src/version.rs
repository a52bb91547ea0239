//! Version types and operations.

use once_cell::sync::Lazy;
use regex::Regex;
use semver::{Prerelease, Version as SemVer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static PY_VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:python|py|v)?(?<major>[0-9]+)(?:\.(?<minor>[0-9]+))?(?:\.[0-9]+)?(?:(?:a|b|rc)[0-9]+)?\+?$").unwrap()
});

static FULL_VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?<major>[0-9]+)\.(?<minor>[0-9]+)(?:\.(?<patch>[0-9]+))?(?:(?<pre>a|b|rc)(?<pre_n>[0-9]+))?(?<dev>\+)?$").unwrap()
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid interpreter version: '{0}'")]
    Invalid(String),
    #[error("incomplete interpreter version '{0}': a minor version is required")]
    Incomplete(String),
    #[error("output does not look like a Python interpreter: '{0}'")]
    Signature(String),
}

/// The `(major, minor)` identity of an interpreter.
///
/// Ordering is purely numeric on `(major, minor)`, so `3.9 < 3.10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PyVersion {
    pub major: u64,
    pub minor: u64,
}

impl PyVersion {
    pub const fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    /// Parse `3.12`, `3.12.4`, `python3.12` or `py3.12`.
    ///
    /// A bare major (`3`) is rejected as [`VersionError::Incomplete`].
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let trimmed = s.trim();
        let caps = PY_VERSION_REGEX
            .captures(trimmed)
            .ok_or_else(|| VersionError::Invalid(s.to_string()))?;

        let major = caps
            .name("major")
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| VersionError::Invalid(s.to_string()))?;
        let minor = caps
            .name("minor")
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| VersionError::Incomplete(s.to_string()))?;

        Ok(Self { major, minor })
    }

    /// Executable name for this version, e.g. `python3.12`.
    pub fn python_name(&self) -> String {
        format!("python{}.{}", self.major, self.minor)
    }
}

impl FromStr for PyVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { PyVersion::parse(s) }
}

impl fmt::Display for PyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl From<PyVersion> for String {
    fn from(v: PyVersion) -> Self { v.to_string() }
}

impl TryFrom<String> for PyVersion {
    type Error = VersionError;

    fn try_from(s: String) -> Result<Self, Self::Error> { PyVersion::parse(&s) }
}

/// A complete interpreter release such as `3.12.1` or `3.13.0rc1`.
///
/// Backed by a semver version so pre-releases order before the final release
/// (`a` < `b` < `rc` < final). The original spelling is kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FullVersion {
    inner: SemVer,
    raw: String,
}

impl FullVersion {
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let raw = s.trim();
        let caps = FULL_VERSION_REGEX
            .captures(raw)
            .ok_or_else(|| VersionError::Invalid(s.to_string()))?;

        let number = |name: &str| -> u64 {
            caps.name(name)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };

        let mut inner = SemVer::new(number("major"), number("minor"), number("patch"));
        if let Some(pre) = caps.name("pre") {
            let tag = format!("{}.{}", pre.as_str(), number("pre_n"));
            inner.pre = Prerelease::new(&tag).map_err(|_| VersionError::Invalid(s.to_string()))?;
        }

        Ok(Self {
            inner,
            raw: raw.to_string(),
        })
    }

    pub fn major(&self) -> u64 { self.inner.major }

    pub fn py_version(&self) -> PyVersion { PyVersion::new(self.inner.major, self.inner.minor) }
}

impl PartialOrd for FullVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

impl Ord for FullVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering { self.inner.cmp(&other.inner) }
}

impl FromStr for FullVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> { FullVersion::parse(s) }
}

impl fmt::Display for FullVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.raw) }
}
