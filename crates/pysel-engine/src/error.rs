use pysel_version::{PyVersion, VersionError};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Python {0} was not found on this system")]
    NotFound(PyVersion),

    #[error("Python {version} at {} is an empty file; reinstall it", path.display())]
    Corrupt { version: PyVersion, path: PathBuf },

    #[error("Python {version} at {} failed to run: {reason}", path.display())]
    ExecFailed {
        version: PyVersion,
        path:    PathBuf,
        reason:  String,
    },

    #[error(transparent)]
    Blocked(#[from] BlockReason),

    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    #[error("not an interpreter or installer command: '{0}'")]
    InvalidCommand(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Shim(#[from] pysel_shim::Error),

    #[error(transparent)]
    Platform(#[from] pysel_platform::Error),

    #[error(transparent)]
    Fs(#[from] pysel_fs::Error),
}

impl From<figment::Error> for EngineError {
    fn from(err: figment::Error) -> Self { EngineError::Config(err.to_string()) }
}

/// Why the policy refused to run a command.
///
/// These are ordinary outcomes, not failures of the engine. Each renders as a
/// message that tells the user how to get unblocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockReason {
    NotFound { version: PyVersion },
    StaleOverride { version: PyVersion, path: Option<PathBuf> },
    VersionMismatch {
        requested: PyVersion,
        active:    Option<PyVersion>,
        root:      PathBuf,
    },
    PipOutsideVenv,
    NoDefault { available: Vec<PyVersion> },
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::NotFound { version } => {
                write!(f, "Python {version} is not installed; run `pysel status` to see what is available")
            }
            BlockReason::StaleOverride { version, path } => {
                write!(f, "the Python {version} override no longer resolves")?;
                if let Some(path) = path {
                    write!(f, " ({} is gone)", path.display())?;
                }
                write!(f, "; run `setpy clear` or `setpy set <version>`")
            }
            BlockReason::VersionMismatch {
                requested,
                active,
                root,
            } => {
                let active = active.map(|v| v.to_string()).unwrap_or_else(|| "unknown".to_string());
                write!(
                    f,
                    "python{requested} does not match the active environment at {} (Python {active}); \
                     deactivate it or use `python`",
                    root.display()
                )
            }
            BlockReason::PipOutsideVenv => f.write_str(
                "pip is blocked outside a virtual environment; activate one, \
                 or run `setpy set <version> --build` to install into an interpreter directly",
            ),
            BlockReason::NoDefault { available } => {
                f.write_str("no environment is active and no default interpreter is set")?;
                if available.is_empty() {
                    f.write_str("; no Python 3 interpreters were found")
                } else {
                    let list: Vec<String> = available.iter().map(ToString::to_string).collect();
                    write!(
                        f,
                        "; run `setpy set <version>` with one of: {}, or call python<version> directly",
                        list.join(", ")
                    )
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_default_lists_versions() {
        let reason = BlockReason::NoDefault {
            available: vec![PyVersion::new(3, 10), PyVersion::new(3, 12)],
        };
        assert!(reason.to_string().contains("3.10, 3.12"));

        let empty = BlockReason::NoDefault { available: vec![] };
        assert!(empty.to_string().contains("no Python 3 interpreters"));
    }

    #[test]
    fn test_blocked_is_transparent() {
        let err = EngineError::from(BlockReason::PipOutsideVenv);
        assert_eq!(err.to_string(), BlockReason::PipOutsideVenv.to_string());
    }

    #[test]
    fn test_block_reason_serializes_tagged() {
        let json = serde_json::to_string(&BlockReason::NotFound {
            version: PyVersion::new(3, 9),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"not_found","version":"3.9"}"#);
    }
}
