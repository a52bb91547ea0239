//! Deciding what a logical command runs.
//!
//! Precedence, first match wins:
//!
//! 1. a bypass condition: the system binary
//! 2. an active environment: its own binary, or the system one
//! 3. a session override: the override interpreter, pip gated on build mode
//! 4. nothing: only version-qualified commands run, straight from the catalog;
//!    pip is blocked either way

use crate::context::Context;
use crate::detect::EnvironmentContext;
use crate::error::{BlockReason, EngineError, Result};
use crate::exports::{self, OverrideState};
use pysel_platform::env::EnvChange;
use pysel_version::{NameHint, PyVersion, interpreter_name_hint};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Python,
    Pip,
}

/// `python`, `python3`, `python3.X`, `pip`, `pip3` or `pip3.X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogicalCommand {
    pub family:  Family,
    pub version: Option<PyVersion>,
    major_only:  bool,
}

impl LogicalCommand {
    pub fn parse(name: &str) -> Result<Self> {
        let invalid = || EngineError::InvalidCommand(name.to_string());
        let stem = name.strip_suffix(std::env::consts::EXE_SUFFIX).unwrap_or(name);

        let (family, as_python) = match stem.strip_prefix("pip") {
            Some(rest) => (Family::Pip, format!("python{rest}")),
            None => (Family::Python, stem.to_string()),
        };

        let (version, major_only) = match interpreter_name_hint(&as_python).ok_or_else(invalid)? {
            NameHint::Bare => (None, false),
            NameHint::Major(3) => (None, true),
            NameHint::Qualified(v) if v.major == 3 => (Some(v), false),
            _ => return Err(invalid()),
        };

        Ok(Self {
            family,
            version,
            major_only,
        })
    }

    pub fn is_pip(&self) -> bool { self.family == Family::Pip }

    /// A pip command, or `python* -m pip ...`.
    pub fn is_pip_module(&self, args: &[String]) -> bool { self.is_pip() || starts_with_pip_module(args) }

    pub fn name(&self) -> String {
        let base = match self.family {
            Family::Python => "python",
            Family::Pip => "pip",
        };
        match (self.version, self.major_only) {
            (Some(v), _) => format!("{base}{v}"),
            (None, true) => format!("{base}3"),
            (None, false) => base.to_string(),
        }
    }
}

impl fmt::Display for LogicalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name()) }
}

fn starts_with_pip_module(args: &[String]) -> bool {
    matches!(args, [flag, module, ..] if flag == "-m" && module == "pip")
}

/// A concrete program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: PathBuf,
    pub args:    Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: &[String]) -> Self {
        Self {
            program: program.into(),
            args:    args.to_vec(),
        }
    }

    /// `<interpreter> -m pip <args>`, without doubling an explicit `-m pip`.
    pub fn pip_module(interpreter: impl Into<PathBuf>, args: &[String]) -> Self {
        let mut full = Vec::with_capacity(args.len() + 2);
        if !starts_with_pip_module(args) {
            full.push("-m".to_string());
            full.push("pip".to_string());
        }
        full.extend_from_slice(args);
        Self {
            program: interpreter.into(),
            args:    full,
        }
    }

    /// Run `command` on `interpreter`: python commands pass `args` through,
    /// pip commands become a pip-module invocation.
    fn on_interpreter(interpreter: impl Into<PathBuf>, command: &LogicalCommand, args: &[String]) -> Self {
        if command.is_pip() {
            Self::pip_module(interpreter, args)
        } else {
            Self::new(interpreter, args)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// The system's own binary; `program` is a bare name when none was found.
    RunSystem(Invocation),
    RunPath(Invocation),
    RunBuildMode(Invocation),
    Block(BlockReason),
}

impl Action {
    pub fn invocation(&self) -> Option<&Invocation> {
        match self {
            Action::RunSystem(inv) | Action::RunPath(inv) | Action::RunBuildMode(inv) => Some(inv),
            Action::Block(_) => None,
        }
    }
}

impl Context {
    /// Decide what `command args` should run.
    pub fn resolve(&mut self, command: &LogicalCommand, args: &[String]) -> Action {
        if let Some(bypass) = self.bypass() {
            tracing::debug!(?bypass, %command, "bypassing");
            return Action::RunSystem(self.system_invocation(command, args));
        }

        let environment = self.environment();
        if environment.is_active() {
            return self.resolve_in_environment(&environment, command, args);
        }

        let state = self.override_state();
        match state.version {
            Some(version) => self.resolve_with_override(&state, version, command, args),
            None => self.resolve_without_default(command, args),
        }
    }

    /// What to run when a bypassed system command turned out to be missing
    /// (127) or not executable (126): the newest cataloged interpreter.
    ///
    /// `None` without a bypass; a system command chosen for an active
    /// environment fails as is.
    pub fn fallback_after_system_failure(&mut self, command: &LogicalCommand, args: &[String]) -> Option<Invocation> {
        let bypass = self.bypass()?;
        let latest = self.catalog.latest()?;
        tracing::warn!(%command, ?bypass, fallback = %latest.path.display(), "system command unavailable; using newest interpreter");
        Some(Invocation::on_interpreter(latest.path, command, args))
    }

    /// Environment changes for launching a system command, with our shim
    /// directory taken off the search path.
    pub fn system_changes(&self) -> Vec<EnvChange> {
        let mut env = self.env.clone();
        if let Some(shim_dir) = self.env.get(exports::SHIM_DIR) {
            let search = env.search_path().remove(Path::new(shim_dir));
            if let Err(err) = env.set_search_path(search) {
                tracing::warn!(error = %err, "shim dir left on the search path");
            }
        }
        env.changes()
    }

    fn resolve_in_environment(
        &mut self,
        environment: &EnvironmentContext,
        command: &LogicalCommand,
        args: &[String],
    ) -> Action {
        let exact = environment.binary(&command.name());

        let Some(requested) = command.version else {
            return match exact {
                Some(path) => Action::RunPath(Invocation::new(path, args)),
                None => Action::RunSystem(self.system_invocation(command, args)),
            };
        };

        if environment.version == Some(requested) {
            if let Some(path) = exact {
                return Action::RunPath(Invocation::new(path, args));
            }
            let unqualified = LogicalCommand {
                version: None,
                ..*command
            };
            let fallback = environment
                .binary(&format!("{}3", unqualified.name()))
                .or_else(|| environment.binary(&unqualified.name()));
            if let Some(path) = fallback {
                return Action::RunPath(Invocation::new(path, args));
            }
            if let Some(python) = environment.binary("python3").or_else(|| environment.binary("python")) {
                return Action::RunPath(Invocation::on_interpreter(python, command, args));
            }
            return Action::RunSystem(self.system_invocation(command, args));
        }

        if let Some(path) = exact {
            return Action::RunPath(Invocation::new(path, args));
        }

        Action::Block(BlockReason::VersionMismatch {
            requested,
            active: environment.version,
            root: environment.root.clone().unwrap_or_default(),
        })
    }

    fn resolve_with_override(
        &mut self,
        state: &OverrideState,
        version: PyVersion,
        command: &LogicalCommand,
        args: &[String],
    ) -> Action {
        let interpreter = match command.version {
            Some(requested) if requested != version => match self.catalog.lookup(requested) {
                Some(record) => record.path,
                None => return Action::Block(BlockReason::NotFound { version: requested }),
            },
            _ => match self.live_override_path(state, version) {
                Some(path) => path,
                None => {
                    return Action::Block(BlockReason::StaleOverride {
                        version,
                        path: state.path.clone(),
                    });
                }
            },
        };

        self.gate_pip(state.build_mode, interpreter, command, args)
    }

    fn resolve_without_default(&mut self, command: &LogicalCommand, args: &[String]) -> Action {
        let Some(requested) = command.version else {
            // Build mode needs an override, so unqualified pip has nothing to run on.
            if command.is_pip_module(args) {
                return Action::Block(BlockReason::PipOutsideVenv);
            }
            return Action::Block(BlockReason::NoDefault {
                available: self.catalog.scan(false).versions(),
            });
        };

        match self.catalog.lookup(requested) {
            Some(record) => {
                let build_mode = self.override_state().build_mode;
                self.gate_pip(build_mode, record.path, command, args)
            }
            None => Action::Block(BlockReason::NotFound { version: requested }),
        }
    }

    fn gate_pip(&self, build_mode: bool, interpreter: PathBuf, command: &LogicalCommand, args: &[String]) -> Action {
        if !command.is_pip_module(args) {
            return Action::RunPath(Invocation::new(interpreter, args));
        }
        if build_mode {
            Action::RunBuildMode(Invocation::on_interpreter(interpreter, command, args))
        } else {
            Action::Block(BlockReason::PipOutsideVenv)
        }
    }

    /// The override interpreter if it still runs; otherwise rescan and
    /// accept the same version from wherever it now lives.
    fn live_override_path(&mut self, state: &OverrideState, version: PyVersion) -> Option<PathBuf> {
        if let Some(path) = state.path.as_ref()
            && pysel_fs::is_executable(path)
            && pysel_fs::is_non_empty_file(path)
        {
            return Some(path.clone());
        }

        self.catalog.invalidate();
        let record = self.catalog.lookup(version)?;
        tracing::warn!(%version, path = %record.real_path.display(), "override path moved; using rescanned interpreter");
        Some(record.real_path)
    }

    /// Locate `command` on the search path with our own shims taken out.
    fn system_invocation(&self, command: &LogicalCommand, args: &[String]) -> Invocation {
        let name = command.name();
        let program = self.system_lookup(&name).unwrap_or_else(|| PathBuf::from(&name));
        Invocation::new(program, args)
    }

    pub(crate) fn system_lookup(&self, name: &str) -> Option<PathBuf> {
        let mut search = self.env.search_path();
        if let Some(shim_dir) = self.env.get(exports::SHIM_DIR) {
            search = search.remove(Path::new(shim_dir));
        }
        let paths = search.build().ok()?;
        let cwd = std::env::current_dir().ok()?;
        which::which_in(name, Some(paths), cwd).ok()
    }

    /// Like [`Context::resolve`], for a command name that may not be one we manage.
    pub fn resolve_name(&mut self, name: &str, args: &[String]) -> Result<Action> {
        let command = LogicalCommand::parse(name)?;
        if let Some(version) = command.version
            && !self.config.supports(version)
        {
            return Err(EngineError::InvalidCommand(name.to_string()));
        }
        Ok(self.resolve(&command, args))
    }
}
