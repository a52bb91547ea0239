//! Engine configuration.
//!
//! Built-in defaults merged with `PYSEL_*` environment variables. There is no
//! configuration file.

use crate::error::{EngineError, Result};
use figment::Figment;
use figment::providers::{Env, Serialized};
use pysel_platform::dir;
use pysel_version::PyVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "PYSEL_";

/// Keys read from the environment. Other `PYSEL_*` variables carry session
/// state and are never configuration.
const ENV_KEYS: &[&str] = &[
    "search_dirs",
    "install_roots",
    "preferred_dir",
    "max_symlink_hops",
    "shim_root",
    "conda_base_is_environment",
    "min_minor",
    "max_minor",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Candidate directories in scan priority order.
    pub search_dirs: Vec<PathBuf>,
    /// Each root is scanned as `<root>/bin` and `<root>/*/bin`, after `search_dirs`.
    pub install_roots: Vec<PathBuf>,
    /// Interpreters here win deduplication regardless of patch level.
    pub preferred_dir: Option<PathBuf>,
    pub max_symlink_hops: usize,
    pub shim_root: PathBuf,
    pub conda_base_is_environment: bool,
    /// Smallest `3.X` minor accepted by version-qualified commands.
    pub min_minor: u64,
    pub max_minor: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let home = dir::user_home();
        let under_home = |rel: &str| home.as_ref().map(|h| h.join(rel));

        let search_dirs = [
            under_home(".local/bin"),
            under_home("bin"),
            under_home(".linuxbrew/bin"),
            Some(PathBuf::from("/home/linuxbrew/.linuxbrew/bin")),
            Some(PathBuf::from("/opt/homebrew/bin")),
            Some(PathBuf::from("/usr/local/bin")),
            Some(PathBuf::from("/usr/bin")),
            Some(PathBuf::from("/bin")),
        ]
        .into_iter()
        .flatten()
        .collect();

        let install_roots = [Some(PathBuf::from("/opt/python")), under_home(".pyenv/versions")]
            .into_iter()
            .flatten()
            .collect();

        Self {
            search_dirs,
            install_roots,
            preferred_dir: dir::user_local_bin(),
            max_symlink_hops: 40,
            shim_root: dir::user_runtime("pysel"),
            conda_base_is_environment: false,
            min_minor: 8,
            max_minor: 25,
        }
    }
}

impl EngineConfig {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(EngineConfig::default()))
            .merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS))
    }

    /// Defaults overlaid with the process environment.
    pub fn load() -> Result<Self> {
        let config: EngineConfig = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.shim_root.is_absolute() {
            return Err(EngineError::Config(format!(
                "shim_root must be absolute: {}",
                self.shim_root.display()
            )));
        }
        if self.min_minor > self.max_minor {
            return Err(EngineError::Config(format!(
                "min_minor {} exceeds max_minor {}",
                self.min_minor, self.max_minor
            )));
        }
        if self.max_symlink_hops == 0 {
            return Err(EngineError::Config("max_symlink_hops must be at least 1".into()));
        }
        Ok(())
    }

    /// Whether `python{version}` has a dedicated handler.
    pub fn supports(&self, version: PyVersion) -> bool {
        version.major == 3 && (self.min_minor..=self.max_minor).contains(&version.minor)
    }

    /// Every directory a catalog scan visits, in priority order.
    pub fn scan_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = self.search_dirs.clone();
        for root in &self.install_roots {
            dirs.extend(install_root_bins(root));
        }
        dirs.dedup();
        dirs
    }
}

fn install_root_bins(root: &Path) -> Vec<PathBuf> {
    let mut bins = vec![root.join("bin")];
    let Ok(entries) = std::fs::read_dir(root) else {
        return bins;
    };

    let mut nested: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path().join("bin"))
        .filter(|p| p.is_dir())
        .collect();
    nested.sort();
    bins.extend(nested);
    bins
}
