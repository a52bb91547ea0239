//! Interpreter discovery.
//!
//! A scan walks the configured directories in priority order, asks every
//! interpreter-named executable for its version, and keeps one record per
//! `(major, minor)`. The result is cached until explicitly invalidated and is
//! always rebuilt from scratch, never patched.

use crate::config::EngineConfig;
use crate::probe::{Probe, VERSION_QUERY};
use pysel_version::{FullVersion, NameHint, PyVersion, VersionHint, interpreter_name_hint, parse_version_output};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterpreterRecord {
    pub version:        PyVersion,
    pub path:           PathBuf,
    pub real_path:      PathBuf,
    pub version_string: String,
    #[serde(skip)]
    pub full:           FullVersion,
}

/// Records sorted ascending by version, at most one per `(major, minor)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    records: Vec<InterpreterRecord>,
}

impl Catalog {
    fn from_records(records: impl IntoIterator<Item = InterpreterRecord>) -> Self {
        let mut records: Vec<_> = records.into_iter().collect();
        records.sort_by_key(|r| r.version);
        Self { records }
    }

    pub fn get(&self, version: PyVersion) -> Option<&InterpreterRecord> {
        self.records
            .binary_search_by_key(&version, |r| r.version)
            .ok()
            .map(|idx| &self.records[idx])
    }

    /// Highest `(major, minor)`.
    pub fn latest(&self) -> Option<&InterpreterRecord> { self.records.last() }

    pub fn versions(&self) -> Vec<PyVersion> { self.records.iter().map(|r| r.version).collect() }

    pub fn iter(&self) -> impl Iterator<Item = &InterpreterRecord> { self.records.iter() }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

/// Lazily scanned, explicitly invalidated interpreter catalog.
#[derive(Debug)]
pub struct InterpreterCatalog {
    dirs:      Vec<PathBuf>,
    preferred: Option<PathBuf>,
    max_hops:  usize,
    probe:     Rc<dyn Probe>,
    catalog:   Catalog,
    scanned:   bool,
}

impl InterpreterCatalog {
    pub fn new(config: &EngineConfig, probe: Rc<dyn Probe>) -> Self {
        Self {
            dirs: config.scan_dirs(),
            preferred: config.preferred_dir.clone(),
            max_hops: config.max_symlink_hops,
            probe,
            catalog: Catalog::default(),
            scanned: false,
        }
    }

    pub fn is_scanned(&self) -> bool { self.scanned }

    pub fn dirs(&self) -> &[PathBuf] { &self.dirs }

    /// Drop the cached catalog; the next access rescans.
    pub fn invalidate(&mut self) {
        self.scanned = false;
        self.catalog = Catalog::default();
    }

    /// Scan unless a cached result exists and `force` is false.
    pub fn scan(&mut self, force: bool) -> &Catalog {
        if force || !self.scanned {
            self.catalog = self.build();
            self.scanned = true;
        }
        &self.catalog
    }

    pub fn lookup(&mut self, version: PyVersion) -> Option<InterpreterRecord> {
        self.scan(false).get(version).cloned()
    }

    pub fn latest(&mut self) -> Option<InterpreterRecord> { self.scan(false).latest().cloned() }

    fn build(&self) -> Catalog {
        let mut identified: HashMap<PathBuf, Option<FullVersion>> = HashMap::new();
        let mut best: Vec<InterpreterRecord> = Vec::new();

        for dir in &self.dirs {
            for (path, hint) in candidates(dir) {
                let real_path = match pysel_fs::resolve_real_path(&path, self.max_hops) {
                    Ok(real) => real,
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "skipping unresolvable candidate");
                        continue;
                    }
                };

                let full = identified
                    .entry(real_path.clone())
                    .or_insert_with(|| self.identify(&path, hint))
                    .clone();
                let Some(full) = full else {
                    continue;
                };
                if full.major() < 3 {
                    tracing::debug!(path = %path.display(), version = %full, "rejecting legacy interpreter");
                    continue;
                }

                let record = InterpreterRecord {
                    version: full.py_version(),
                    path,
                    real_path,
                    version_string: full.to_string(),
                    full,
                };
                self.merge(&mut best, record);
            }
        }

        let catalog = Catalog::from_records(best);
        tracing::debug!(count = catalog.len(), "catalog scan complete");
        catalog
    }

    fn merge(&self, best: &mut Vec<InterpreterRecord>, record: InterpreterRecord) {
        let Some(existing) = best.iter_mut().find(|r| r.version == record.version) else {
            tracing::debug!(path = %record.path.display(), version = %record.version_string, "found interpreter");
            best.push(record);
            return;
        };

        let existing_preferred = self.is_preferred(&existing.path);
        let candidate_preferred = self.is_preferred(&record.path);
        let replace = match (existing_preferred, candidate_preferred) {
            (true, false) => false,
            (false, true) => true,
            _ => record.full > existing.full,
        };

        if replace {
            tracing::debug!(
                kept = %record.path.display(),
                dropped = %existing.path.display(),
                version = %record.version,
                "replacing duplicate interpreter"
            );
            *existing = record;
        }
    }

    fn is_preferred(&self, path: &Path) -> bool {
        self.preferred
            .as_deref()
            .is_some_and(|preferred| path.parent() == Some(preferred))
    }

    /// `--version` first, then the file name, then an embedded query.
    fn identify(&self, path: &Path, hint: NameHint) -> Option<FullVersion> {
        let output = self.probe.run(path, &["--version"])?;
        let major = match parse_version_output(&output) {
            Ok(VersionHint::Full(full)) => return Some(full),
            Ok(VersionHint::MajorOnly(major)) => major,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "rejecting candidate");
                return None;
            }
        };

        if let NameHint::Qualified(version) = hint
            && version.major == major
        {
            return FullVersion::parse(&version.to_string()).ok();
        }

        let output = self.probe.run(path, &["-c", VERSION_QUERY])?;
        match parse_version_output(&output) {
            Ok(VersionHint::Full(full)) => Some(full),
            _ => {
                tracing::warn!(path = %path.display(), "could not determine interpreter version");
                None
            }
        }
    }
}

/// Interpreter-named executables in `dir`, most specific name first.
fn candidates(dir: &Path) -> Vec<(PathBuf, NameHint)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut found: Vec<(PathBuf, NameHint)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let file_name = e.file_name();
            let name = file_name.to_str()?;
            let stem = name.strip_suffix(std::env::consts::EXE_SUFFIX).unwrap_or(name);
            let hint = interpreter_name_hint(stem)?;
            Some((e.path(), hint))
        })
        .filter(|(path, _)| pysel_fs::is_executable(path))
        .collect();

    found.sort_by(|(a_path, a), (b_path, b)| specificity(*b).cmp(&specificity(*a)).then_with(|| a_path.cmp(b_path)));
    found
}

fn specificity(hint: NameHint) -> u8 {
    match hint {
        NameHint::Qualified(_) => 2,
        NameHint::Major(_) => 1,
        NameHint::Bare => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Answers from a table keyed by file name and records every call.
    #[derive(Default)]
    struct TableProbe {
        answers: HashMap<(String, String), String>,
        calls:   RefCell<Vec<String>>,
    }

    impl TableProbe {
        fn answer(mut self, name: &str, arg: &str, output: &str) -> Self {
            self.answers.insert((name.into(), arg.into()), output.into());
            self
        }
    }

    impl Probe for TableProbe {
        fn run(&self, program: &Path, args: &[&str]) -> Option<String> {
            let name = program.file_name()?.to_string_lossy().into_owned();
            self.calls.borrow_mut().push(name.clone());
            self.answers.get(&(name, args[0].to_string())).cloned()
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        pysel_fs::PermissionMode::Executable.apply_to_path(&path).unwrap();
        path
    }

    fn catalog(dirs: Vec<PathBuf>, preferred: Option<PathBuf>, probe: TableProbe) -> InterpreterCatalog {
        let config = EngineConfig {
            search_dirs: dirs,
            install_roots: vec![],
            preferred_dir: preferred,
            ..EngineConfig::default()
        };
        InterpreterCatalog::new(&config, Rc::new(probe))
    }

    #[cfg(unix)]
    #[test]
    fn test_major_only_falls_back_to_file_name() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "python3.11");
        let probe = TableProbe::default().answer("python3.11", "--version", "Python 3\n");

        let mut cat = catalog(vec![dir.path().to_path_buf()], None, probe);
        let record = cat.lookup(PyVersion::new(3, 11)).unwrap();
        assert_eq!(record.version_string, "3.11");
    }

    #[cfg(unix)]
    #[test]
    fn test_major_only_falls_back_to_embedded_query() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "python3");
        let probe = TableProbe::default()
            .answer("python3", "--version", "Python 3")
            .answer("python3", "-c", "Python 3.13.2\n");

        let mut cat = catalog(vec![dir.path().to_path_buf()], None, probe);
        assert_eq!(cat.latest().unwrap().version_string, "3.13.2");
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_foreign_signature_and_python2() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "python");
        touch(dir.path(), "python2");
        let probe = TableProbe::default()
            .answer("python", "--version", "PyPy-ish thing 7.3")
            .answer("python2", "--version", "Python 2.7.18");

        let mut cat = catalog(vec![dir.path().to_path_buf()], None, probe);
        assert!(cat.scan(false).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_links_to_same_binary_are_probed_once() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "python3.12");
        std::os::unix::fs::symlink("python3.12", dir.path().join("python3")).unwrap();
        std::os::unix::fs::symlink("python3", dir.path().join("python")).unwrap();

        let probe = Rc::new(TableProbe::default().answer("python3.12", "--version", "Python 3.12.2"));
        let config = EngineConfig {
            search_dirs: vec![dir.path().to_path_buf()],
            install_roots: vec![],
            ..EngineConfig::default()
        };
        let mut cat = InterpreterCatalog::new(&config, probe.clone());

        let record = cat.lookup(PyVersion::new(3, 12)).unwrap();
        assert_eq!(record.path, dir.path().join("python3.12"));
        assert_eq!(probe.calls.borrow().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_is_cached_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let probe = TableProbe::default()
            .answer("python3.10", "--version", "Python 3.10.4")
            .answer("python3.12", "--version", "Python 3.12.0");
        touch(dir.path(), "python3.10");

        let mut cat = catalog(vec![dir.path().to_path_buf()], None, probe);
        assert_eq!(cat.scan(false).versions(), vec![PyVersion::new(3, 10)]);

        touch(dir.path(), "python3.12");
        assert_eq!(cat.scan(false).len(), 1);

        cat.invalidate();
        assert!(!cat.is_scanned());
        assert_eq!(
            cat.scan(false).versions(),
            vec![PyVersion::new(3, 10), PyVersion::new(3, 12)]
        );
    }

    #[test]
    fn test_candidates_order_by_specificity() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["python", "python3", "python3.12", "python3-config", "pip3"] {
            touch(dir.path(), name);
        }

        let names: Vec<String> = candidates(dir.path())
            .into_iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["python3.12", "python3", "python"]);
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        assert!(candidates(Path::new("/nonexistent/pysel/bin")).is_empty());
    }
}
