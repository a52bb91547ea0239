//! Read-only views of engine state for troubleshooting.

use crate::catalog::Catalog;
use crate::context::{BYPASS_VAR, Bypass, CI_VARS, Context, SANDBOX_VAR};
use crate::detect::EnvironmentContext;
use crate::exports::{self, OverrideState, PriorToggle};
use crate::policy::Action;
use pysel_version::PyVersion;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const DEBUG_VAR: &str = "PYSEL_DEBUG";

/// Where one command name would go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub command: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    System(PathBuf),
    Path(PathBuf),
    BuildMode(PathBuf),
    Blocked(String),
    Unmanaged(String),
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Outcome::System(p) => write!(f, "{}: system ({})", self.command, p.display()),
            Outcome::Path(p) => write!(f, "{}: {}", self.command, p.display()),
            Outcome::BuildMode(p) => write!(f, "{}: {} [build mode]", self.command, p.display()),
            Outcome::Blocked(reason) => write!(f, "{}: blocked: {reason}", self.command),
            Outcome::Unmanaged(reason) => write!(f, "{}: {reason}", self.command),
        }
    }
}

/// Everything the engine knows, for `debug`.
#[derive(Debug, Clone, Serialize)]
pub struct StateDump {
    pub engine_available: bool,
    pub interactive:      bool,
    pub debug:            bool,
    pub bypass:           Option<Bypass>,
    pub indicators:       BTreeMap<String, String>,
    pub session:          String,
    pub session_owner:    Option<String>,
    pub environment:      EnvironmentContext,
    pub override_state:   OverrideState,
    pub pip_prior:        Option<PriorToggle>,
    pub pip_toggle:       Option<String>,
    pub detector_cache:   Option<(PathBuf, Option<PyVersion>)>,
    pub scan_dirs:        Vec<PathBuf>,
    pub shim_root:        PathBuf,
    pub catalog:          Catalog,
}

impl StateDump {
    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string_pretty(self) }
}

fn or_dash<T: fmt::Display>(value: Option<T>) -> String { value.map_or_else(|| "-".to_string(), |v| v.to_string()) }

impl fmt::Display for StateDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "engine available: {}", self.engine_available)?;
        writeln!(f, "interactive:      {}", self.interactive)?;
        writeln!(f, "debug:            {}", self.debug)?;
        writeln!(f, "bypass:           {}", or_dash(self.bypass.map(|b| format!("{b:?}"))))?;
        for (key, value) in &self.indicators {
            writeln!(f, "  {key}={value}")?;
        }
        writeln!(f, "session:          {} (owner {})", self.session, or_dash(self.session_owner.as_deref()))?;
        writeln!(f, "environment:      {}", self.environment.kind)?;
        writeln!(f, "  root:           {}", or_dash(self.environment.root.as_ref().map(|p| p.display())))?;
        writeln!(f, "  version:        {}", or_dash(self.environment.version))?;
        writeln!(f, "override:         {}", or_dash(self.override_state.version))?;
        writeln!(f, "  path:           {}", or_dash(self.override_state.path.as_ref().map(|p| p.display())))?;
        writeln!(f, "  build mode:     {}", self.override_state.build_mode)?;
        writeln!(f, "  shim dir:       {}", or_dash(self.override_state.shim_dir.as_ref().map(|p| p.display())))?;
        writeln!(f, "pip prior:        {}", or_dash(self.pip_prior.as_ref().map(PriorToggle::encode)))?;
        writeln!(f, "{}: {}", exports::PIP_REQUIRE_VIRTUALENV, or_dash(self.pip_toggle.as_deref()))?;
        if let Some((root, version)) = &self.detector_cache {
            writeln!(f, "detector cache:   {} -> {}", root.display(), or_dash(*version))?;
        }
        writeln!(f, "shim root:        {}", self.shim_root.display())?;
        writeln!(f, "scan dirs:")?;
        for dir in &self.scan_dirs {
            writeln!(f, "  {}", dir.display())?;
        }
        writeln!(f, "catalog ({}):", self.catalog.len())?;
        for record in self.catalog.iter() {
            writeln!(f, "  {:<6} {:<10} {}", record.version, record.version_string, record.path.display())?;
        }
        Ok(())
    }
}

/// The human `status` view.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub environment:    EnvironmentContext,
    pub override_state: OverrideState,
    pub catalog:        Catalog,
}

impl Context {
    /// Report what each name resolves to without running anything.
    pub fn which(&mut self, names: &[String]) -> Vec<ResolutionReport> {
        names
            .iter()
            .map(|name| {
                let outcome = match self.resolve_name(name, &[]) {
                    Ok(Action::RunSystem(inv)) => Outcome::System(inv.program),
                    Ok(Action::RunPath(inv)) => Outcome::Path(inv.program),
                    Ok(Action::RunBuildMode(inv)) => Outcome::BuildMode(inv.program),
                    Ok(Action::Block(reason)) => Outcome::Blocked(reason.to_string()),
                    Err(err) => Outcome::Unmanaged(err.to_string()),
                };
                ResolutionReport {
                    command: name.clone(),
                    outcome,
                }
            })
            .collect()
    }

    /// Full state, including a forced catalog scan.
    pub fn state_dump(&mut self) -> StateDump {
        let environment = self.environment();
        let catalog = self.catalog.scan(true).clone();

        let indicators = CI_VARS
            .iter()
            .chain([BYPASS_VAR, SANDBOX_VAR, DEBUG_VAR].iter())
            .filter_map(|key| self.env.get(key).map(|v| (key.to_string(), v.to_string())))
            .collect();

        StateDump {
            engine_available: true,
            interactive: self.interactive,
            debug: self.env.is_truthy(DEBUG_VAR),
            bypass: self.bypass(),
            indicators,
            session: self.session.clone(),
            session_owner: self.env.get(exports::SESSION).map(str::to_string),
            environment,
            override_state: self.override_state(),
            pip_prior: exports::prior_toggle(&self.env),
            pip_toggle: self.env.get(exports::PIP_REQUIRE_VIRTUALENV).map(str::to_string),
            detector_cache: self.detector.cached().map(|(root, v)| (root.to_path_buf(), v)),
            scan_dirs: self.catalog.dirs().to_vec(),
            shim_root: self.config.shim_root.clone(),
            catalog,
        }
    }

    pub fn status(&mut self) -> StatusSummary {
        StatusSummary {
            environment:    self.environment(),
            override_state: self.override_state(),
            catalog:        self.catalog.scan(false).clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display() {
        let report = ResolutionReport {
            command: "pip".into(),
            outcome: Outcome::Blocked("nope".into()),
        };
        assert_eq!(report.to_string(), "pip: blocked: nope");

        let report = ResolutionReport {
            command: "python3".into(),
            outcome: Outcome::Path(PathBuf::from("/b/python3.12")),
        };
        assert_eq!(report.to_string(), "python3: /b/python3.12");
    }
}
