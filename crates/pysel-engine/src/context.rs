use crate::catalog::InterpreterCatalog;
use crate::config::EngineConfig;
use crate::detect::{EnvironmentContext, EnvironmentDetector};
use crate::error::Result;
use crate::exports;
use crate::probe::{ProcessProbe, Probe};
use pysel_platform::env::EnvSnapshot;
use pysel_shim::ShimPublisher;
use serde::Serialize;
use std::rc::Rc;

/// Why resolution defers to the system binary without consulting any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "variable", rename_all = "snake_case")]
pub enum Bypass {
    Forced,
    Ci(&'static str),
    Sandbox,
    NonInteractive,
}

pub const BYPASS_VAR: &str = "PYSEL_BYPASS";
pub const SANDBOX_VAR: &str = "CODEX_SANDBOX_NETWORK_DISABLED";
pub const CI_VARS: &[&str] = &["CI", "GITHUB_ACTIONS", "GITLAB_CI", "BUILDKITE", "JENKINS_URL", "TF_BUILD"];

/// Everything one process knows: configuration, the environment it works
/// on, and the caches built from them.
#[derive(Debug)]
pub struct Context {
    pub(crate) config:      EngineConfig,
    pub(crate) env:         EnvSnapshot,
    pub(crate) session:     String,
    pub(crate) interactive: bool,
    pub(crate) probe:       Rc<dyn Probe>,
    pub(crate) catalog:     InterpreterCatalog,
    pub(crate) detector:    EnvironmentDetector,
    pub(crate) shims:       ShimPublisher,
}

impl Context {
    pub fn builder() -> ContextBuilder { ContextBuilder::default() }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn env(&self) -> &EnvSnapshot { &self.env }

    pub fn session(&self) -> &str { &self.session }

    pub fn is_interactive(&self) -> bool { self.interactive }

    pub fn catalog(&mut self) -> &mut InterpreterCatalog { &mut self.catalog }

    /// The first bypass condition that holds, if any.
    pub fn bypass(&self) -> Option<Bypass> {
        if self.env.is_truthy(BYPASS_VAR) {
            return Some(Bypass::Forced);
        }
        if let Some(var) = CI_VARS.iter().copied().find(|v| self.env.is_set(v)) {
            return Some(Bypass::Ci(var));
        }
        if self.env.is_set(SANDBOX_VAR) {
            return Some(Bypass::Sandbox);
        }
        if !self.interactive {
            return Some(Bypass::NonInteractive);
        }
        None
    }

    pub fn environment(&mut self) -> EnvironmentContext { self.detector.detect(&mut self.env) }

    pub fn detector(&self) -> &EnvironmentDetector { &self.detector }
}

#[derive(Default)]
pub struct ContextBuilder {
    config:      Option<EngineConfig>,
    env:         Option<EnvSnapshot>,
    session:     Option<String>,
    interactive: bool,
    probe:       Option<Rc<dyn Probe>>,
}

impl ContextBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn env(mut self, env: EnvSnapshot) -> Self {
        self.env = Some(env);
        self
    }

    pub fn session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Some(Rc::new(probe));
        self
    }

    /// Missing pieces default to the loaded configuration, the real process
    /// environment, the parent process id and a spawning probe.
    pub fn build(self) -> Result<Context> {
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => EngineConfig::load()?,
        };
        let mut env = self.env.unwrap_or_else(EnvSnapshot::capture);
        let session = self.session.unwrap_or_else(default_session);
        let probe: Rc<dyn Probe> = match self.probe {
            Some(probe) => probe,
            None => Rc::new(ProcessProbe),
        };

        if exports::enforce_session_boundary(&mut env, &session) {
            tracing::debug!(session = %session, "session state corrected");
        }

        let catalog = InterpreterCatalog::new(&config, probe.clone());
        let detector = EnvironmentDetector::new(config.conda_base_is_environment, config.max_symlink_hops, probe.clone());
        let shims = ShimPublisher::new(&config.shim_root, session.clone());

        Ok(Context {
            config,
            env,
            session,
            interactive: self.interactive,
            probe,
            catalog,
            detector,
            shims,
        })
    }
}

/// The hosting shell is our parent, so its pid names the session.
pub fn default_session() -> String {
    #[cfg(unix)]
    {
        std::os::unix::process::parent_id().to_string()
    }

    #[cfg(not(unix))]
    {
        std::process::id().to_string()
    }
}

/// The engine as the host sees it: a context, or the reason there is none.
///
/// An unavailable engine means every command goes straight to the system.
#[derive(Debug)]
pub struct Engine {
    inner: std::result::Result<Context, String>,
}

impl Engine {
    pub fn init(builder: ContextBuilder) -> Self {
        let inner = builder.build().map_err(|err| {
            tracing::warn!(error = %err, "engine unavailable; deferring to system commands");
            err.to_string()
        });
        Self { inner }
    }

    pub fn available(&self) -> bool { self.inner.is_ok() }

    pub fn context(&self) -> Option<&Context> { self.inner.as_ref().ok() }

    pub fn context_mut(&mut self) -> Option<&mut Context> { self.inner.as_mut().ok() }

    pub fn unavailable_reason(&self) -> Option<&str> { self.inner.as_ref().err().map(String::as_str) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    struct NoProbe;

    impl Probe for NoProbe {
        fn run(&self, _program: &Path, _args: &[&str]) -> Option<String> { None }
    }

    fn builder(pairs: &[(&str, &str)]) -> ContextBuilder {
        Context::builder()
            .config(EngineConfig {
                search_dirs: vec![],
                install_roots: vec![],
                ..EngineConfig::default()
            })
            .env(EnvSnapshot::from_pairs(pairs.iter().copied()))
            .session("1")
            .interactive(true)
            .probe(NoProbe)
    }

    #[test]
    fn test_bypass_order() {
        let ctx = builder(&[]).build().unwrap();
        assert_eq!(ctx.bypass(), None);

        let ctx = builder(&[("GITHUB_ACTIONS", "true")]).build().unwrap();
        assert_eq!(ctx.bypass(), Some(Bypass::Ci("GITHUB_ACTIONS")));

        let ctx = builder(&[(SANDBOX_VAR, "1"), (BYPASS_VAR, "1")]).build().unwrap();
        assert_eq!(ctx.bypass(), Some(Bypass::Forced));

        let ctx = builder(&[("CI", "")]).interactive(false).build().unwrap();
        assert_eq!(ctx.bypass(), Some(Bypass::NonInteractive));
    }

    #[test]
    fn test_build_enforces_session_boundary() {
        let ctx = builder(&[(exports::SESSION, "99"), (exports::BUILD_MODE, "1"), (exports::OVERRIDE, "3.12")])
            .build()
            .unwrap();
        assert_eq!(ctx.env().get(exports::SESSION), Some("1"));
        assert_eq!(ctx.env().get(exports::BUILD_MODE), None);
        assert_eq!(ctx.env().get(exports::OVERRIDE), Some("3.12"));
    }

    #[test]
    fn test_engine_unavailable_on_bad_config() {
        let engine = Engine::init(Context::builder().config(EngineConfig {
            shim_root: PathBuf::from("relative"),
            ..EngineConfig::default()
        }));
        assert!(!engine.available());
        assert!(engine.context().is_none());
        assert!(engine.unavailable_reason().unwrap().contains("shim_root"));
    }

    #[test]
    fn test_engine_available() {
        let engine = Engine::init(builder(&[]));
        assert!(engine.available());
        assert_eq!(engine.context().unwrap().session(), "1");
    }
}
