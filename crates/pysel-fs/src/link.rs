use crate::{Error, Result, from_io};
use std::path::{Path, PathBuf};

/// Follow a symlink chain to the canonical file it names.
///
/// At most `max_hops` links are followed; a longer (or cyclic) chain is an
/// [`Error::SymlinkLoop`]. Relative link targets are resolved against the
/// directory containing the link.
pub fn resolve_real_path(path: impl AsRef<Path>, max_hops: usize) -> Result<PathBuf> {
    let start = path.as_ref();
    let mut current = start.to_path_buf();
    let mut hops = 0;

    loop {
        let meta = std::fs::symlink_metadata(&current).map_err(|e| from_io(&current, e))?;
        if !meta.file_type().is_symlink() {
            break;
        }

        if hops == max_hops {
            return Err(Error::SymlinkLoop {
                path: start.to_path_buf(),
                hops: max_hops,
            });
        }
        hops += 1;

        let target = std::fs::read_link(&current).map_err(|e| from_io(&current, e))?;
        current = if target.is_absolute() {
            target
        } else {
            current.parent().unwrap_or(Path::new("/")).join(target)
        };
    }

    // Directory components may still be links; the file itself no longer is.
    std::fs::canonicalize(&current).map_err(|e| from_io(&current, e))
}

/// Point `link` at `target`, replacing any existing entry at `link`.
pub fn atomic_symlink(target: impl AsRef<Path>, link: impl AsRef<Path>) -> Result<()> {
    let target = target.as_ref();
    let link = link.as_ref();

    let file_name = link.file_name().unwrap_or_default().to_string_lossy();
    let tmp_link = link.with_file_name(format!(".{file_name}.tmp"));
    let _ = std::fs::remove_file(&tmp_link);

    #[cfg(unix)]
    std::os::unix::fs::symlink(target, &tmp_link).map_err(|e| from_io(&tmp_link, e))?;

    #[cfg(windows)]
    std::os::windows::fs::symlink_file(target, &tmp_link).map_err(|e| from_io(&tmp_link, e))?;

    #[cfg(not(any(unix, windows)))]
    return Err(Error::SymlinkNotSupported);

    #[cfg(any(unix, windows))]
    {
        std::fs::rename(&tmp_link, link).map_err(|e| from_io(link, e))?;
        Ok(())
    }
}
