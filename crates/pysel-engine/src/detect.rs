//! Active environment detection.

use crate::probe::Probe;
use pysel_platform::env::{EnvSnapshot, PATH_VAR};
use pysel_version::{PyVersion, VersionHint, parse_version_output};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const VIRTUAL_ENV: &str = "VIRTUAL_ENV";
pub const CONDA_PREFIX: &str = "CONDA_PREFIX";
pub const CONDA_DEFAULT_ENV: &str = "CONDA_DEFAULT_ENV";
pub const POETRY_ACTIVE: &str = "POETRY_ACTIVE";
pub const PIPENV_ACTIVE: &str = "PIPENV_ACTIVE";

const DESCRIPTOR: &str = "pyvenv.cfg";

#[cfg(windows)]
const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const BIN_DIR: &str = "bin";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvKind {
    #[default]
    None,
    Venv,
    Conda,
    Poetry,
    Pipenv,
}

impl std::fmt::Display for EnvKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EnvKind::None => "none",
            EnvKind::Venv => "venv",
            EnvKind::Conda => "conda",
            EnvKind::Poetry => "poetry",
            EnvKind::Pipenv => "pipenv",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentContext {
    pub kind:    EnvKind,
    pub root:    Option<PathBuf>,
    pub bin_dir: Option<PathBuf>,
    pub version: Option<PyVersion>,
}

impl EnvironmentContext {
    fn active(kind: EnvKind, root: PathBuf) -> Self {
        let bin_dir = environment_bin_dir(kind, &root);
        Self {
            kind,
            root: Some(root),
            bin_dir: Some(bin_dir),
            version: None,
        }
    }

    pub fn is_active(&self) -> bool { self.kind != EnvKind::None }

    /// `name` inside the environment's bin directory, if it is executable there.
    pub fn binary(&self, name: &str) -> Option<PathBuf> {
        let bin = self.bin_dir.as_ref()?;
        let path = bin.join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
        pysel_fs::is_executable(&path).then_some(path)
    }
}

fn environment_bin_dir(kind: EnvKind, root: &Path) -> PathBuf {
    if cfg!(windows) && kind == EnvKind::Conda {
        root.to_path_buf()
    } else {
        root.join(BIN_DIR)
    }
}

/// Observes the environment; the only write is the `VIRTUAL_ENV` marker the
/// heuristic synthesizes.
#[derive(Debug)]
pub struct EnvironmentDetector {
    conda_base: bool,
    max_hops:   usize,
    probe:      Rc<dyn Probe>,
    cache:      Option<(PathBuf, Option<PyVersion>)>,
}

impl EnvironmentDetector {
    pub fn new(conda_base: bool, max_hops: usize, probe: Rc<dyn Probe>) -> Self {
        Self {
            conda_base,
            max_hops,
            probe,
            cache: None,
        }
    }

    /// The last `(root, version)` pair computed.
    pub fn cached(&self) -> Option<(&Path, Option<PyVersion>)> {
        self.cache.as_ref().map(|(root, v)| (root.as_path(), *v))
    }

    /// Detect the active environment and its version.
    pub fn detect(&mut self, env: &mut EnvSnapshot) -> EnvironmentContext {
        let mut ctx = self.locate(env);
        if ctx.is_active() {
            ctx.version = self.version(&ctx);
        }
        ctx
    }

    fn locate(&self, env: &mut EnvSnapshot) -> EnvironmentContext {
        let tool_kind = if env.is_truthy(POETRY_ACTIVE) {
            EnvKind::Poetry
        } else if env.is_truthy(PIPENV_ACTIVE) {
            EnvKind::Pipenv
        } else {
            EnvKind::Venv
        };

        if let Some(root) = env.get(VIRTUAL_ENV).filter(|v| !v.is_empty()) {
            return EnvironmentContext::active(tool_kind, PathBuf::from(root));
        }

        if let Some(prefix) = env.get(CONDA_PREFIX).filter(|v| !v.is_empty()) {
            let is_base = env.get(CONDA_DEFAULT_ENV) == Some("base");
            if !is_base || self.conda_base {
                return EnvironmentContext::active(EnvKind::Conda, PathBuf::from(prefix));
            }
            tracing::debug!(prefix, "ignoring conda base environment");
        }

        match self.discover(env) {
            Some(root) => {
                tracing::debug!(root = %root.display(), "discovered unmarked virtual environment");
                env.set(VIRTUAL_ENV, root.to_string_lossy());
                EnvironmentContext::active(tool_kind, root)
            }
            None => EnvironmentContext::default(),
        }
    }

    /// Find a virtual environment from where `python` on the search path lives.
    fn discover(&self, env: &EnvSnapshot) -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        let located = which::which_in("python", env.get(PATH_VAR), cwd).ok()?;

        if let Some(root) = venv_root_of(&located) {
            return Some(root);
        }
        let real = pysel_fs::resolve_real_path(&located, self.max_hops).ok()?;
        venv_root_of(&real)
    }

    /// Version of an active environment, cached per root.
    pub fn version(&mut self, ctx: &EnvironmentContext) -> Option<PyVersion> {
        let root = ctx.root.as_ref()?;
        if let Some((cached_root, version)) = &self.cache
            && cached_root == root
        {
            return *version;
        }

        let version = read_descriptor_version(root).or_else(|| {
            let python = ctx.binary("python").or_else(|| ctx.binary("python3"))?;
            let output = self.probe.run(&python, &["--version"])?;
            match parse_version_output(&output).ok()? {
                VersionHint::Full(full) => Some(full.py_version()),
                VersionHint::MajorOnly(_) => None,
            }
        });

        self.cache = Some((root.clone(), version));
        version
    }
}

/// `<root>` when `binary` sits in `<root>/bin` next to an activation script
/// and `<root>` holds a descriptor.
fn venv_root_of(binary: &Path) -> Option<PathBuf> {
    let bin = binary.parent()?;
    let root = bin.parent()?;
    let marked = root.join(DESCRIPTOR).is_file() && bin.join("activate").is_file();
    marked.then(|| root.to_path_buf())
}

/// `version` or `version_info` from `<root>/pyvenv.cfg`.
pub fn read_descriptor_version(root: &Path) -> Option<PyVersion> {
    let content = std::fs::read_to_string(root.join(DESCRIPTOR)).ok()?;
    content.lines().find_map(|line| {
        let (key, value) = line.split_once('=')?;
        if !matches!(key.trim(), "version" | "version_info") {
            return None;
        }
        let mut parts = value.trim().split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = parts.next()?.trim().parse().ok()?;
        Some(PyVersion::new(major, minor))
    })
}
