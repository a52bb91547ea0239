use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown shell: {0}")]
    UnknownShell(String),

    #[error("command not found: {cmd}")]
    CommandNotFound { cmd: String },

    #[error("command not executable: {cmd}")]
    NotExecutable { cmd: String },

    #[error("command failed: {cmd}, source: {source}")]
    CommandFailed { cmd: String, source: std::io::Error },

    #[error("search path entry cannot be joined: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exit status a shell would report for this failure, if it has one.
    ///
    /// `127` means not found and `126` means found but not executable.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::CommandNotFound { .. } => Some(127),
            Error::NotExecutable { .. } => Some(126),
            _ => None,
        }
    }
}
