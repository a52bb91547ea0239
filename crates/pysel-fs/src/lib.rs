mod error;
mod link;
mod permissions;

pub use error::{Error, Result, from_io};
pub use link::{atomic_symlink, resolve_real_path};
pub use permissions::{PermissionMode, ensure_private_dir, is_executable, is_non_empty_file};

use std::path::Path;

#[cfg(unix)]
const DEFAULT_PERMISSIONS: u32 = 0o644;

#[cfg(not(unix))]
const DEFAULT_PERMISSIONS: u32 = 0;

#[derive(Clone, Copy, Debug)]
pub struct AtomicWriteOptions {
    permissions: u32,
    prefix:      &'static str,
    suffix:      &'static str,
}

impl Default for AtomicWriteOptions {
    fn default() -> Self { Self::new() }
}

impl AtomicWriteOptions {
    pub fn new() -> Self {
        Self {
            permissions: DEFAULT_PERMISSIONS,
            prefix:      ".",
            suffix:      ".tmp",
        }
    }

    /// Options for a script that must be directly executable.
    pub fn executable() -> Self { Self::new().mode(PermissionMode::Executable) }

    pub fn mode(mut self, mode: PermissionMode) -> Self {
        self.permissions = mode.unix_mode();
        self
    }
}

/// Write `content` to a sibling temp file and rename it over `path`.
///
/// Readers never observe a half-written file; the final permissions are in
/// place before the rename.
pub fn atomic_write(path: impl AsRef<Path>, content: &[u8], options: AtomicWriteOptions) -> Result<()> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or(Path::new(""));

    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    let tmp_path = parent.join(format!("{}{}{}", options.prefix, file_name, options.suffix));

    std::fs::write(&tmp_path, content).map_err(|e| from_io(&tmp_path, e))?;
    PermissionMode::Custom(options.permissions).apply_to_path(&tmp_path)?;

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(from_io(path, e));
    }

    Ok(())
}

/// Remove a directory tree. Returns `false` when there was nothing to remove.
pub fn remove_tree(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed directory tree");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(from_io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_replaces_content() -> Result<()> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shim");
        atomic_write(&path, b"old", AtomicWriteOptions::new())?;
        atomic_write(&path, b"new", AtomicWriteOptions::new())?;
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert!(!dir.path().join(".shim.tmp").exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_atomic_write_executable() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("python");
        atomic_write(&path, b"#!/bin/sh\n", AtomicWriteOptions::executable())?;

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert!(is_executable(&path));
        Ok(())
    }

    #[test]
    fn test_atomic_write_missing_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("file");
        let err = atomic_write(&path, b"x", AtomicWriteOptions::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_remove_tree_idempotent() -> Result<()> {
        let dir = tempdir().unwrap();
        let tree = dir.path().join("shims");
        std::fs::create_dir_all(tree.join("nested")).unwrap();
        std::fs::write(tree.join("nested").join("python"), "x").unwrap();

        assert!(remove_tree(&tree)?);
        assert!(!tree.exists());
        assert!(!remove_tree(&tree)?);
        Ok(())
    }
}
