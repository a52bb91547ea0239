use crate::{Error, Result, from_io};
use std::path::Path;

/// File permission modes used when materializing files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PermissionMode {
    /// Leave whatever the process umask produced.
    #[default]
    Inherit,

    /// `0o755`: owner can read/write/execute, others can read/execute.
    Executable,

    /// `0o644`: owner can read/write, others can read.
    ReadWrite,

    /// Raw Unix mode bits. Ignored on Windows.
    Custom(u32),
}

impl PermissionMode {
    pub fn unix_mode(self) -> u32 {
        match self {
            Self::Inherit | Self::ReadWrite => 0o644,
            Self::Executable => 0o755,
            Self::Custom(mode) => mode,
        }
    }

    pub fn apply_to_path(self, path: &Path) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            if self == Self::Inherit {
                return Ok(());
            }
            let perms = std::fs::Permissions::from_mode(self.unix_mode());
            std::fs::set_permissions(path, perms).map_err(|e| from_io(path, e))?;
        }

        #[cfg(not(unix))]
        {
            let _ = path;
        }

        Ok(())
    }
}

/// Whether `path` is a regular file this process may execute.
///
/// Follows symlinks. On Unix this asks the kernel (`access(2)` with `X_OK`)
/// rather than inspecting mode bits, so ownership and ACLs are honored.
pub fn is_executable(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use nix::unistd::{AccessFlags, access};
        access(path, AccessFlags::X_OK).is_ok()
    }

    #[cfg(not(unix))]
    {
        true
    }
}

/// Whether `path` is a regular file with at least one byte of content.
///
/// A zero-length interpreter is what a truncated copy or an interrupted
/// install leaves behind.
pub fn is_non_empty_file(path: impl AsRef<Path>) -> bool {
    std::fs::metadata(path.as_ref())
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Create `path` if needed and make sure only the current user can use it.
///
/// An existing directory must be a real directory owned by this user; its
/// mode is tightened to `0o700`. On Windows only existence is checked.
pub fn ensure_private_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).map_err(|e| from_io(path, e))?;

    let meta = std::fs::symlink_metadata(path).map_err(|e| from_io(path, e))?;
    if !meta.is_dir() {
        return Err(Error::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        check_owner(path, meta.uid(), nix::unistd::getuid().as_raw())?;
        PermissionMode::Custom(0o700).apply_to_path(path)?;
    }

    Ok(())
}

#[cfg(unix)]
fn check_owner(path: &Path, owner: u32, uid: u32) -> Result<()> {
    if owner == uid {
        Ok(())
    } else {
        Err(Error::NotOwned {
            path: path.to_path_buf(),
            owner,
        })
    }
}
