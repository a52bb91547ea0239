//! Setting and clearing the session override.

use crate::context::Context;
use crate::error::{EngineError, Result};
use crate::exports::{self, OverrideState};
use pysel_shim::Placement;
use pysel_version::{PyVersion, VersionHint, parse_version_output};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What a successful `set` committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideChange {
    pub version:    PyVersion,
    pub path:       PathBuf,
    pub build_mode: bool,
    pub shim_dir:   PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClearOutcome {
    NothingToClear,
    Cleared {
        version:    Option<PyVersion>,
        build_mode: bool,
    },
}

impl Context {
    pub fn override_state(&self) -> OverrideState { OverrideState::read(&self.env) }

    /// Point the session at `version`, optionally with build mode.
    ///
    /// The catalog is rescanned first and the interpreter must run before
    /// anything is committed.
    pub fn set_override(&mut self, version: PyVersion, build_mode: bool) -> Result<OverrideChange> {
        self.catalog.invalidate();
        let record = self.catalog.lookup(version).ok_or(EngineError::NotFound(version))?;
        let path = record.real_path;

        if !pysel_fs::is_non_empty_file(&path) {
            return Err(EngineError::Corrupt { version, path });
        }
        self.verify_runs(version, &path)?;

        let previous = OverrideState::read(&self.env);
        let environment = self.environment();

        if let Some(old) = previous.shim_dir.as_deref()
            && self.shims.owns(old)
        {
            self.shims.retire(old, &mut self.env)?;
        }
        let placement = Placement {
            after:     environment.bin_dir.as_deref().filter(|_| environment.is_active()),
            replacing: previous.shim_dir.as_deref(),
        };
        let shims = self.shims.publish(&path, version, placement, &mut self.env)?;

        exports::write_override(&mut self.env, version, &path, &self.session);
        exports::write_shim_dir(&mut self.env, Some(shims.dir()));
        if build_mode {
            exports::enter_build_mode(&mut self.env);
        } else {
            exports::leave_build_mode(&mut self.env);
        }

        tracing::info!(%version, path = %path.display(), build_mode, "override set");
        Ok(OverrideChange {
            version,
            path,
            build_mode,
            shim_dir: shims.dir().to_path_buf(),
        })
    }

    /// Remove the override, restore the pip toggle and retire the shims.
    pub fn clear_override(&mut self) -> Result<ClearOutcome> {
        let state = OverrideState::read(&self.env);
        let build_pending = self.env.get(exports::BUILD_MODE).is_some() || exports::prior_toggle(&self.env).is_some();
        if !state.is_set() && state.shim_dir.is_none() && !build_pending {
            return Ok(ClearOutcome::NothingToClear);
        }

        exports::leave_build_mode(&mut self.env);

        if let Some(dir) = state.shim_dir.as_deref() {
            if self.shims.owns(dir) {
                self.shims.retire(dir, &mut self.env)?;
            } else {
                // Another session's shims: stop using them, leave them in place.
                let search = self.env.search_path().remove(dir);
                self.env.set_search_path(search)?;
            }
        }
        exports::clear_override(&mut self.env);

        tracing::info!(version = ?state.version, "override cleared");
        Ok(ClearOutcome::Cleared {
            version:    state.version,
            build_mode: state.build_mode,
        })
    }

    fn verify_runs(&self, version: PyVersion, path: &Path) -> Result<()> {
        let exec_failed = |reason: String| EngineError::ExecFailed {
            version,
            path: path.to_path_buf(),
            reason,
        };

        let output = self
            .probe
            .run(path, &["--version"])
            .ok_or_else(|| exec_failed("the version query did not run".into()))?;
        match parse_version_output(&output) {
            Ok(VersionHint::Full(full)) if full.py_version() == version => Ok(()),
            Ok(VersionHint::Full(full)) => Err(exec_failed(format!("it reports Python {full}"))),
            // The catalog already resolved an ambiguous major; nothing more to learn here.
            Ok(VersionHint::MajorOnly(major)) if major == version.major => Ok(()),
            Ok(VersionHint::MajorOnly(major)) => Err(exec_failed(format!("it reports Python {major}"))),
            Err(err) => Err(exec_failed(err.to_string())),
        }
    }
}
