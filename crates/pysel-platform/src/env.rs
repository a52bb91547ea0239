//! Process environment as an explicit value.
//!
//! The engine never reads or writes the real process environment directly.
//! It works on an [`EnvSnapshot`] captured once at startup and keeps the
//! captured state, so the caller can hand the net changes to a child process
//! or render them as a script for the parent shell to evaluate.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

pub const PATH_VAR: &str = if cfg!(target_os = "windows") { "Path" } else { "PATH" };

/// A single net change to one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvChange {
    Set(String, String),
    Unset(String),
}

impl EnvChange {
    pub fn key(&self) -> &str {
        match self {
            EnvChange::Set(k, _) | EnvChange::Unset(k) => k,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    original: BTreeMap<String, String>,
    vars:     BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment. Non-UTF-8 entries are skipped.
    pub fn capture() -> Self {
        Self::from_pairs(
            env::vars_os().filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars: BTreeMap<String, String> = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self {
            original: vars.clone(),
            vars,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> { self.vars.get(key).map(String::as_str) }

    /// Present and non-empty.
    pub fn is_set(&self, key: &str) -> bool { self.get(key).is_some_and(|v| !v.is_empty()) }

    /// `1`, `true`, `yes` or `on`, case-insensitive.
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| {
            matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        })
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) { self.vars.remove(key); }

    /// Net changes since capture, sorted by variable name.
    ///
    /// A variable changed and then put back to its captured value is not a
    /// change.
    pub fn changes(&self) -> Vec<EnvChange> {
        let set = self
            .vars
            .iter()
            .filter(|(k, v)| self.original.get(*k) != Some(*v))
            .map(|(k, v)| EnvChange::Set(k.clone(), v.clone()));
        let unset = self
            .original
            .keys()
            .filter(|k| !self.vars.contains_key(*k))
            .map(|k| EnvChange::Unset(k.clone()));

        let mut changes: Vec<EnvChange> = set.chain(unset).collect();
        changes.sort_by(|a, b| a.key().cmp(b.key()));
        changes
    }

    pub fn has_changes(&self) -> bool { self.vars != self.original }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn search_path(&self) -> PathModifier {
        PathModifier::from_value(self.get(PATH_VAR).unwrap_or_default())
    }

    pub fn set_search_path(&mut self, modifier: PathModifier) -> Result<()> {
        let value = modifier.build()?;
        self.set(PATH_VAR, value);
        Ok(())
    }
}

fn paths_equal(p1: &Path, p2: &Path) -> bool {
    fn normalize(p: &Path) -> String {
        let s = p.to_string_lossy();
        let s = s.trim_end_matches(['/', '\\']);
        if cfg!(target_os = "windows") { s.to_lowercase() } else { s.to_string() }
    }
    normalize(p1) == normalize(p2)
}

/// Ordered edits to a search-path value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathModifier {
    paths: Vec<PathBuf>,
}

impl PathModifier {
    pub fn new(paths: Vec<PathBuf>) -> Self { Self { paths } }

    pub fn from_value(value: &str) -> Self {
        if value.is_empty() {
            return Self::default();
        }
        Self::new(env::split_paths(value).collect())
    }

    /// Move `path` to the front, dropping any other occurrence.
    pub fn prepend(mut self, path: PathBuf) -> Self {
        self.paths.retain(|p| !paths_equal(p, &path));
        self.paths.insert(0, path);
        self
    }

    /// Place `path` right after the first occurrence of `anchor`, or at the
    /// front when `anchor` is absent.
    pub fn insert_after(mut self, anchor: &Path, path: PathBuf) -> Self {
        self.paths.retain(|p| !paths_equal(p, &path));
        match self.paths.iter().position(|p| paths_equal(p, anchor)) {
            Some(idx) => self.paths.insert(idx + 1, path),
            None => self.paths.insert(0, path),
        }
        self
    }

    pub fn remove(mut self, path: &Path) -> Self {
        self.paths.retain(|p| !paths_equal(p, path));
        self
    }

    pub fn contains(&self, path: &Path) -> bool { self.paths.iter().any(|p| paths_equal(p, path)) }

    pub fn position(&self, path: &Path) -> Option<usize> {
        self.paths.iter().position(|p| paths_equal(p, path))
    }

    pub fn entries(&self) -> &[PathBuf] { &self.paths }

    pub fn build(self) -> Result<String> {
        let joined = env::join_paths(&self.paths).map_err(|e| Error::InvalidPath(e.to_string()))?;
        joined
            .into_string()
            .map_err(|s| Error::InvalidPath(s.to_string_lossy().into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> EnvSnapshot {
        EnvSnapshot::from_pairs([("HOME", "/home/u"), ("FLAG", "Yes"), ("EMPTY", "")])
    }

    #[test]
    fn test_get_and_flags() {
        let env = snapshot();
        assert_eq!(env.get("HOME"), Some("/home/u"));
        assert!(env.is_truthy("FLAG"));
        assert!(!env.is_truthy("HOME"));
        assert!(!env.is_set("EMPTY"));
        assert!(!env.is_set("MISSING"));
    }

    #[test]
    fn test_changes_are_net() {
        let mut env = snapshot();
        env.set("A", "1");
        env.set("A", "2");
        env.remove("HOME");
        env.set("FLAG", "Yes");
        env.remove("NEVER_SET");

        assert_eq!(
            env.changes(),
            vec![
                EnvChange::Set("A".into(), "2".into()),
                EnvChange::Unset("HOME".into()),
            ]
        );
    }

    #[test]
    fn test_round_trip_to_captured_value_is_no_change() {
        let mut env = snapshot();
        env.set("X", "1");
        env.remove("X");
        env.set("HOME", "/elsewhere");
        env.set("HOME", "/home/u");
        assert!(!env.has_changes());
        assert!(env.changes().is_empty());
        assert_eq!(env.get("X"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_path_modifier_prepend_moves_existing() {
        let modifier = PathModifier::from_value("/a:/b:/c").prepend(PathBuf::from("/c/"));
        assert_eq!(modifier.build().unwrap(), "/c/:/a:/b");
    }

    #[cfg(unix)]
    #[test]
    fn test_path_modifier_insert_after_anchor() {
        let modifier = PathModifier::from_value("/venv/bin:/usr/bin")
            .insert_after(Path::new("/venv/bin"), PathBuf::from("/shims"));
        assert_eq!(modifier.build().unwrap(), "/venv/bin:/shims:/usr/bin");
    }

    #[cfg(unix)]
    #[test]
    fn test_path_modifier_insert_after_missing_anchor_prepends() {
        let modifier = PathModifier::from_value("/usr/bin")
            .insert_after(Path::new("/venv/bin"), PathBuf::from("/shims"));
        assert_eq!(modifier.build().unwrap(), "/shims:/usr/bin");
    }

    #[cfg(unix)]
    #[test]
    fn test_path_modifier_remove() {
        let modifier = PathModifier::from_value("/shims:/usr/bin:/shims").remove(Path::new("/shims"));
        assert!(!modifier.contains(Path::new("/shims")));
        assert_eq!(modifier.entries().len(), 1);
    }

    #[test]
    fn test_path_modifier_empty_value() {
        assert!(PathModifier::from_value("").entries().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_round_trip_through_snapshot() {
        let mut env = EnvSnapshot::from_pairs([(PATH_VAR, "/usr/bin")]);
        let modifier = env.search_path().prepend(PathBuf::from("/shims"));
        env.set_search_path(modifier).unwrap();

        assert_eq!(env.get(PATH_VAR), Some("/shims:/usr/bin"));
        assert_eq!(
            env.changes(),
            vec![EnvChange::Set(PATH_VAR.into(), "/shims:/usr/bin".into())]
        );
    }

    #[test]
    fn test_paths_equal_normalization() {
        assert!(paths_equal(Path::new("/path/"), Path::new("/path")));
        assert!(!paths_equal(Path::new("/path1"), Path::new("/path2")));
    }
}
