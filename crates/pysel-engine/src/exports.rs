//! The variables that carry override state across process boundaries.
//!
//! Nothing else crosses: the catalog, detector cache and capability flag are
//! rebuilt by every process.

use pysel_platform::env::EnvSnapshot;
use pysel_version::PyVersion;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const PYTHON: &str = "PYSEL_PYTHON";
pub const PYTHON_PATH: &str = "PYSEL_PYTHON_PATH";
pub const OVERRIDE: &str = "PYSEL_OVERRIDE";
pub const BUILD_MODE: &str = "PYSEL_BUILD_MODE";
pub const PIP_PRIOR: &str = "PYSEL_PIP_PRIOR";
pub const SHIM_DIR: &str = "PYSEL_SHIM_DIR";
pub const SESSION: &str = "PYSEL_SESSION";

/// pip's own switch for refusing to install outside a virtual environment.
pub const PIP_REQUIRE_VIRTUALENV: &str = "PIP_REQUIRE_VIRTUALENV";

/// The pip-safety toggle as it was before build mode touched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum PriorToggle {
    Unset,
    Set(String),
}

impl PriorToggle {
    pub fn capture(env: &EnvSnapshot) -> Self {
        match env.get(PIP_REQUIRE_VIRTUALENV) {
            Some(value) => PriorToggle::Set(value.to_string()),
            None => PriorToggle::Unset,
        }
    }

    /// `!` for unset, `=<value>` for set; the prefix keeps an empty value
    /// distinct from an absent one.
    pub fn encode(&self) -> String {
        match self {
            PriorToggle::Unset => "!".to_string(),
            PriorToggle::Set(value) => format!("={value}"),
        }
    }

    pub fn decode(raw: &str) -> Option<Self> {
        if raw == "!" {
            return Some(PriorToggle::Unset);
        }
        raw.strip_prefix('=').map(|v| PriorToggle::Set(v.to_string()))
    }

    fn restore(&self, env: &mut EnvSnapshot) {
        match self {
            PriorToggle::Unset => env.remove(PIP_REQUIRE_VIRTUALENV),
            PriorToggle::Set(value) => env.set(PIP_REQUIRE_VIRTUALENV, value.as_str()),
        }
    }
}

/// Override state as read back from the exported variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverrideState {
    pub version:    Option<PyVersion>,
    pub build_mode: bool,
    pub session:    Option<String>,
    pub path:       Option<PathBuf>,
    pub shim_dir:   Option<PathBuf>,
}

impl OverrideState {
    pub fn read(env: &EnvSnapshot) -> Self {
        let version = env.get(OVERRIDE).and_then(|v| PyVersion::parse(v).ok());
        let path = env
            .get(PYTHON)
            .or_else(|| env.get(PYTHON_PATH))
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Self {
            version,
            // Build mode without a version is meaningless and is ignored.
            build_mode: version.is_some() && env.is_truthy(BUILD_MODE),
            session: env.get(SESSION).map(str::to_string),
            path,
            shim_dir: env.get(SHIM_DIR).filter(|p| !p.is_empty()).map(PathBuf::from),
        }
    }

    pub fn is_set(&self) -> bool { self.version.is_some() }
}

pub fn prior_toggle(env: &EnvSnapshot) -> Option<PriorToggle> { env.get(PIP_PRIOR).and_then(PriorToggle::decode) }

pub fn write_override(env: &mut EnvSnapshot, version: PyVersion, path: &Path, session: &str) {
    let path = path.to_string_lossy();
    env.set(OVERRIDE, version.to_string());
    env.set(PYTHON, path.as_ref());
    env.set(PYTHON_PATH, path.as_ref());
    env.set(SESSION, session);
}

pub fn write_shim_dir(env: &mut EnvSnapshot, dir: Option<&Path>) {
    match dir {
        Some(dir) => env.set(SHIM_DIR, dir.to_string_lossy()),
        None => env.remove(SHIM_DIR),
    }
}

pub fn clear_override(env: &mut EnvSnapshot) {
    for key in [OVERRIDE, PYTHON, PYTHON_PATH, SHIM_DIR, SESSION] {
        env.remove(key);
    }
}

/// Turn build mode on, capturing the toggle only on the first entry so a
/// repeated `set --build` cannot overwrite the real prior value.
pub fn enter_build_mode(env: &mut EnvSnapshot) {
    if prior_toggle(env).is_none() {
        let prior = PriorToggle::capture(env);
        env.set(PIP_PRIOR, prior.encode());
    }
    env.set(PIP_REQUIRE_VIRTUALENV, "false");
    env.set(BUILD_MODE, "1");
}

/// Turn build mode off and put the toggle back exactly as it was.
///
/// Returns whether anything was restored.
pub fn leave_build_mode(env: &mut EnvSnapshot) -> bool {
    let prior = prior_toggle(env);
    if let Some(prior) = &prior {
        prior.restore(env);
    }
    let was_on = env.get(BUILD_MODE).is_some();
    env.remove(PIP_PRIOR);
    env.remove(BUILD_MODE);
    prior.is_some() || was_on
}

/// Bring inherited state in line with `session`.
///
/// Build mode never survives into a different session; the override version
/// and interpreter path do. Returns `true` when a boundary was crossed.
pub fn enforce_session_boundary(env: &mut EnvSnapshot, session: &str) -> bool {
    let Some(owner) = env.get(SESSION) else {
        return false;
    };
    if owner == session {
        return false;
    }

    tracing::debug!(owner, session, "entered a new session");
    if leave_build_mode(env) {
        tracing::info!("build mode cleared at session boundary");
    }
    env.set(SESSION, session);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prior_toggle_encoding() {
        assert_eq!(PriorToggle::decode("!"), Some(PriorToggle::Unset));
        assert_eq!(PriorToggle::decode("="), Some(PriorToggle::Set(String::new())));
        assert_eq!(PriorToggle::decode("=true"), Some(PriorToggle::Set("true".into())));
        assert_eq!(PriorToggle::decode("garbage"), None);
        assert_eq!(PriorToggle::Set("1".into()).encode(), "=1");
        assert_eq!(PriorToggle::Unset.encode(), "!");
    }

    #[test]
    fn test_build_mode_restores_unset_toggle() {
        let mut env = EnvSnapshot::default();
        enter_build_mode(&mut env);
        assert_eq!(env.get(PIP_REQUIRE_VIRTUALENV), Some("false"));

        assert!(leave_build_mode(&mut env));
        assert_eq!(env.get(PIP_REQUIRE_VIRTUALENV), None);
        assert_eq!(env.get(PIP_PRIOR), None);
        assert_eq!(env.get(BUILD_MODE), None);
    }

    #[test]
    fn test_build_mode_restores_set_toggle() {
        let mut env = EnvSnapshot::from_pairs([(PIP_REQUIRE_VIRTUALENV, "true")]);
        enter_build_mode(&mut env);
        enter_build_mode(&mut env);
        leave_build_mode(&mut env);
        assert_eq!(env.get(PIP_REQUIRE_VIRTUALENV), Some("true"));
        assert!(!env.has_changes());
    }

    #[test]
    fn test_leave_without_build_mode_is_noop() {
        let mut env = EnvSnapshot::from_pairs([(PIP_REQUIRE_VIRTUALENV, "1")]);
        assert!(!leave_build_mode(&mut env));
        assert!(!env.has_changes());
    }

    #[test]
    fn test_read_state() {
        let env = EnvSnapshot::from_pairs([
            (OVERRIDE, "3.12"),
            (PYTHON_PATH, "/b/python3.12"),
            (BUILD_MODE, "1"),
            (SESSION, "9"),
        ]);
        let state = OverrideState::read(&env);
        assert_eq!(state.version, Some(PyVersion::new(3, 12)));
        assert_eq!(state.path, Some(PathBuf::from("/b/python3.12")));
        assert!(state.build_mode);
        assert_eq!(state.session.as_deref(), Some("9"));
    }

    #[test]
    fn test_build_mode_requires_version() {
        let env = EnvSnapshot::from_pairs([(BUILD_MODE, "1")]);
        assert!(!OverrideState::read(&env).build_mode);
    }

    #[test]
    fn test_session_boundary_drops_build_mode_only() {
        let mut env = EnvSnapshot::from_pairs([
            (OVERRIDE, "3.12"),
            (PYTHON, "/b/python3.12"),
            (BUILD_MODE, "1"),
            (PIP_PRIOR, "=yes"),
            (PIP_REQUIRE_VIRTUALENV, "false"),
            (SESSION, "100"),
        ]);

        assert!(enforce_session_boundary(&mut env, "200"));
        let state = OverrideState::read(&env);
        assert_eq!(state.version, Some(PyVersion::new(3, 12)));
        assert!(!state.build_mode);
        assert_eq!(state.session.as_deref(), Some("200"));
        assert_eq!(env.get(PIP_REQUIRE_VIRTUALENV), Some("yes"));

        assert!(!enforce_session_boundary(&mut env, "200"));
    }

    #[test]
    fn test_no_session_recorded_is_not_a_boundary() {
        let mut env = EnvSnapshot::default();
        assert!(!enforce_session_boundary(&mut env, "1"));
        assert!(!env.has_changes());
    }
}
