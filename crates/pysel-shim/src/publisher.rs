use crate::error::{Error, Result};
use crate::script;
use pysel_fs::{AtomicWriteOptions, atomic_symlink, atomic_write, ensure_private_dir, remove_tree};
use pysel_platform::env::EnvSnapshot;
use pysel_version::PyVersion;
use std::path::{Path, PathBuf};

/// A published set of redirectors for one interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimSet {
    dir: PathBuf,
}

impl ShimSet {
    pub fn dir(&self) -> &Path { &self.dir }
}

/// Where a new shim directory goes in the search path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placement<'a> {
    /// An active environment's own bin directory; shims go right after it.
    pub after:     Option<&'a Path>,
    /// A previously published shim directory whose entry is dropped first.
    pub replacing: Option<&'a Path>,
}

/// Publishes shim sets under `<root>/<session>/`.
///
/// Each session owns its own subdirectory, so concurrent shells never share
/// or clobber each other's shims.
#[derive(Debug, Clone)]
pub struct ShimPublisher {
    root:    PathBuf,
    session: String,
}

impl ShimPublisher {
    pub fn new(root: impl Into<PathBuf>, session: impl Into<String>) -> Self {
        Self {
            root:    root.into(),
            session: session.into(),
        }
    }

    pub fn session_dir(&self) -> PathBuf { self.root.join(sanitize(&self.session)) }

    pub fn root(&self) -> &Path { &self.root }

    /// Whether `dir` was published by this session.
    pub fn owns(&self, dir: &Path) -> bool { dir.starts_with(self.session_dir()) }

    /// Deterministic directory for `version` within this session.
    pub fn dir_for(&self, version: PyVersion) -> PathBuf { self.session_dir().join(format!("py{version}")) }

    /// Write redirectors for `target` and splice their directory into `env`'s search path.
    pub fn publish(
        &self,
        target: &Path,
        version: PyVersion,
        placement: Placement<'_>,
        env: &mut EnvSnapshot,
    ) -> Result<ShimSet> {
        if !target.is_absolute() || !target.is_file() {
            return Err(Error::InvalidTarget(target.to_path_buf()));
        }

        // Both levels must belong to us before anything is written under them.
        ensure_private_dir(&self.root)?;
        ensure_private_dir(self.session_dir())?;

        let dir = self.dir_for(version);
        remove_tree(&dir)?;
        std::fs::create_dir(&dir).map_err(|e| pysel_fs::from_io(&dir, e))?;

        let body = script::redirector(target);
        for command in ["python", "python3"] {
            let path = dir.join(script::file_name(command));
            atomic_write(&path, body.as_bytes(), AtomicWriteOptions::executable())?;
        }

        let versioned = dir.join(script::file_name(&version.python_name()));
        if cfg!(windows) {
            atomic_write(&versioned, body.as_bytes(), AtomicWriteOptions::executable())?;
        } else {
            atomic_symlink(target, &versioned)?;
        }

        let mut search = env.search_path();
        if let Some(previous) = placement.replacing {
            search = search.remove(previous);
        }
        search = match placement.after {
            Some(anchor) => search.insert_after(anchor, dir.clone()),
            None => search.prepend(dir.clone()),
        };
        env.set_search_path(search)?;

        tracing::info!(dir = %dir.display(), target = %target.display(), %version, "published shims");

        Ok(ShimSet { dir })
    }

    /// Delete a shim directory and drop it from `env`'s search path.
    ///
    /// Idempotent: retiring something already gone only fixes up the search path.
    pub fn retire(&self, dir: &Path, env: &mut EnvSnapshot) -> Result<bool> {
        if !dir.starts_with(&self.root) {
            return Err(Error::ForeignDirectory {
                root: self.root.clone(),
                dir:  dir.to_path_buf(),
            });
        }

        let removed = remove_tree(dir)?;

        let search = env.search_path();
        if search.contains(dir) {
            env.set_search_path(search.remove(dir))?;
        }

        if removed {
            tracing::info!(dir = %dir.display(), "retired shims");
        }
        Ok(removed)
    }
}

fn sanitize(session: &str) -> String {
    let cleaned: String = session
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "default".to_string() } else { cleaned }
}
