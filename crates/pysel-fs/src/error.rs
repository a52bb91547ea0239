use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("symlink chain starting at {} exceeds {hops} hops", path.display())]
    SymlinkLoop { path: PathBuf, hops: usize },

    #[error("{} is owned by uid {owner}, not by this user", path.display())]
    NotOwned { path: PathBuf, owner: u32 },

    #[error("expected a real directory, found a symlink or file: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("symlink not supported on this platform")]
    SymlinkNotSupported,

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach a path to an I/O error, keeping the common kinds distinguishable.
pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Error {
    let path = path.into();
    match err.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound { path },
        std::io::ErrorKind::PermissionDenied => Error::PermissionDenied { path },
        _ => Error::Io { path, source: err },
    }
}
