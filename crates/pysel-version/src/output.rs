//! Interpreting what an interpreter tells us about itself.

use crate::version::{FullVersion, PyVersion, VersionError};
use once_cell::sync::Lazy;
use regex::Regex;

static NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^python(?:(?<major>[0-9]+)(?:\.(?<minor>[0-9]+))?)?$").unwrap());

static BARE_MAJOR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?<major>[0-9]+)\+?$").unwrap());

/// What a single probe learned about an interpreter's version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionHint {
    Full(FullVersion),
    /// Only the major is known (`Python 3`); must be re-derived another way.
    MajorOnly(u64),
}

/// Version information encoded in an executable's file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameHint {
    /// `python`
    Bare,
    /// `python3`
    Major(u64),
    /// `python3.12`
    Qualified(PyVersion),
}

/// Parse the output of `python --version`.
///
/// The first line starting with `Python ` carries the version. Output without
/// that signature is rejected; a bare major (`Python 3`) yields
/// [`VersionHint::MajorOnly`].
pub fn parse_version_output(output: &str) -> Result<VersionHint, VersionError> {
    for line in output.lines() {
        let Some(rest) = line.trim().strip_prefix("Python ") else {
            continue;
        };
        let token = rest.split_whitespace().next().unwrap_or_default();

        if let Some(caps) = BARE_MAJOR_REGEX.captures(token) {
            let major = caps["major"]
                .parse()
                .map_err(|_| VersionError::Invalid(token.to_string()))?;
            return Ok(VersionHint::MajorOnly(major));
        }

        return FullVersion::parse(token).map(VersionHint::Full);
    }

    Err(VersionError::Signature(output.trim().to_string()))
}

/// Whether a file name follows the interpreter naming pattern.
///
/// Matches `python`, `python3` and `python3.12`; rejects `python3-config`,
/// `python3.12m` and friends.
pub fn is_interpreter_name(name: &str) -> bool { NAME_REGEX.is_match(name) }

pub fn interpreter_name_hint(name: &str) -> Option<NameHint> {
    let caps = NAME_REGEX.captures(name)?;
    let major = caps.name("major").and_then(|m| m.as_str().parse().ok());
    let minor = caps.name("minor").and_then(|m| m.as_str().parse().ok());

    Some(match (major, minor) {
        (Some(major), Some(minor)) => NameHint::Qualified(PyVersion::new(major, minor)),
        (Some(major), None) => NameHint::Major(major),
        _ => NameHint::Bare,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(output: &str) -> FullVersion {
        match parse_version_output(output).unwrap() {
            VersionHint::Full(v) => v,
            other => panic!("expected a full version, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_version_output_full() {
        assert_eq!(full("Python 3.12.1\n").to_string(), "3.12.1");
    }

    #[test]
    fn test_parse_version_output_prerelease() {
        let pre = full("Python 3.14.0a2+");
        assert!(pre < FullVersion::parse("3.14.0").unwrap());
        assert_eq!(pre.py_version(), PyVersion::new(3, 14));
    }

    #[test]
    fn test_parse_version_output_bare_major() {
        assert_eq!(parse_version_output("Python 3").unwrap(), VersionHint::MajorOnly(3));
    }

    #[test]
    fn test_parse_version_output_skips_banner_lines() {
        let out = "warning: something odd\nPython 3.11.9\n";
        assert_eq!(full(out).py_version(), PyVersion::new(3, 11));
    }

    #[test]
    fn test_parse_version_output_rejects_other_products() {
        assert!(matches!(
            parse_version_output("PyPy 7.3.15"),
            Err(VersionError::Signature(_))
        ));
        assert!(matches!(parse_version_output(""), Err(VersionError::Signature(_))));
        assert!(matches!(
            parse_version_output("Python snake"),
            Err(VersionError::Invalid(_))
        ));
    }

    #[test]
    fn test_is_interpreter_name() {
        assert!(is_interpreter_name("python"));
        assert!(is_interpreter_name("python3"));
        assert!(is_interpreter_name("python3.12"));
        assert!(!is_interpreter_name("python3-config"));
        assert!(!is_interpreter_name("python3.12-config"));
        assert!(!is_interpreter_name("python3.12m"));
        assert!(!is_interpreter_name("ipython"));
    }

    #[test]
    fn test_interpreter_name_hint() {
        assert_eq!(interpreter_name_hint("python"), Some(NameHint::Bare));
        assert_eq!(interpreter_name_hint("python3"), Some(NameHint::Major(3)));
        assert_eq!(
            interpreter_name_hint("python3.10"),
            Some(NameHint::Qualified(PyVersion::new(3, 10)))
        );
        assert_eq!(interpreter_name_hint("pip3"), None);
    }
}
