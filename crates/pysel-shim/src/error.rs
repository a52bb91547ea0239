//! Error types for shim operations.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("shim target must be an absolute path to an existing file: {}", .0.display())]
    InvalidTarget(PathBuf),

    #[error("refusing to manage shim directory outside {}: {}", root.display(), dir.display())]
    ForeignDirectory { root: PathBuf, dir: PathBuf },

    #[error(transparent)]
    Fs(#[from] pysel_fs::Error),

    #[error(transparent)]
    Platform(#[from] pysel_platform::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
