#![cfg(unix)]

use pysel_platform::env::{EnvSnapshot, PATH_VAR};
use pysel_shim::{Placement, ShimPublisher};
use pysel_version::PyVersion;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn fake_python(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, "#!/bin/sh\necho \"Python 3.12.4\"\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn path_entries(env: &EnvSnapshot) -> Vec<PathBuf> { env.search_path().entries().to_vec() }

#[test]
fn test_publish_writes_redirectors_and_prepends() {
    let root = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let target = fake_python(bin.path(), "python3.12");

    let publisher = ShimPublisher::new(root.path().join("shims"), "1001");
    let mut env = EnvSnapshot::from_pairs([(PATH_VAR, "/usr/bin:/bin")]);

    let set = publisher
        .publish(&target, PyVersion::new(3, 12), Placement::default(), &mut env)
        .unwrap();

    assert!(set.dir().ends_with("1001/py3.12"));
    for name in ["python", "python3", "python3.12"] {
        assert!(pysel_fs::is_executable(set.dir().join(name)), "{name} not executable");
    }
    assert!(set.dir().join("python3.12").is_symlink());

    let script = std::fs::read_to_string(set.dir().join("python3")).unwrap();
    assert!(script.contains(&target.display().to_string()));

    assert_eq!(path_entries(&env)[0], set.dir());
    assert_eq!(std::fs::read_link(set.dir().join("python3.12")).unwrap(), target);
}

#[test]
fn test_publish_keeps_root_and_session_private() {
    let root = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let target = fake_python(bin.path(), "python3.12");

    let shims = root.path().join("shims");
    std::fs::create_dir(&shims).unwrap();
    std::fs::set_permissions(&shims, std::fs::Permissions::from_mode(0o755)).unwrap();

    let publisher = ShimPublisher::new(&shims, "1001");
    let mut env = EnvSnapshot::default();
    publisher
        .publish(&target, PyVersion::new(3, 12), Placement::default(), &mut env)
        .unwrap();

    for dir in [shims.clone(), publisher.session_dir()] {
        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700, "{}", dir.display());
    }
}

#[test]
fn test_publish_refuses_symlinked_session_dir() {
    let root = tempdir().unwrap();
    let elsewhere = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let target = fake_python(bin.path(), "python3.12");

    let publisher = ShimPublisher::new(root.path(), "1001");
    std::os::unix::fs::symlink(elsewhere.path(), publisher.session_dir()).unwrap();

    let mut env = EnvSnapshot::default();
    let err = publisher
        .publish(&target, PyVersion::new(3, 12), Placement::default(), &mut env)
        .unwrap_err();
    assert!(matches!(err, pysel_shim::Error::Fs(pysel_fs::Error::NotADirectory { .. })));
    assert!(!env.has_changes());
}

#[test]
fn test_redirector_forwards_to_target() {
    let root = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let target = fake_python(bin.path(), "python3.12");

    let publisher = ShimPublisher::new(root.path(), "s");
    let mut env = EnvSnapshot::default();
    let set = publisher
        .publish(&target, PyVersion::new(3, 12), Placement::default(), &mut env)
        .unwrap();

    let out = std::process::Command::new(set.dir().join("python"))
        .arg("--version")
        .output()
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "Python 3.12.4");
}

#[test]
fn test_publish_goes_after_environment_bin() {
    let root = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let target = fake_python(bin.path(), "python3.12");

    let publisher = ShimPublisher::new(root.path(), "s");
    let mut env = EnvSnapshot::from_pairs([(PATH_VAR, "/venv/bin:/usr/bin")]);
    let placement = Placement {
        after:     Some(Path::new("/venv/bin")),
        replacing: None,
    };
    let set = publisher
        .publish(&target, PyVersion::new(3, 12), placement, &mut env)
        .unwrap();

    let entries = path_entries(&env);
    assert_eq!(entries[0], PathBuf::from("/venv/bin"));
    assert_eq!(entries[1], set.dir());
}

#[test]
fn test_republish_replaces_previous_entry() {
    let root = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let py311 = fake_python(bin.path(), "python3.11");
    let py312 = fake_python(bin.path(), "python3.12");

    let publisher = ShimPublisher::new(root.path(), "s");
    let mut env = EnvSnapshot::from_pairs([(PATH_VAR, "/usr/bin")]);

    let first = publisher
        .publish(&py311, PyVersion::new(3, 11), Placement::default(), &mut env)
        .unwrap();
    publisher.retire(first.dir(), &mut env).unwrap();

    let placement = Placement {
        after:     None,
        replacing: Some(first.dir()),
    };
    let second = publisher
        .publish(&py312, PyVersion::new(3, 12), placement, &mut env)
        .unwrap();

    let entries = path_entries(&env);
    assert!(!entries.contains(&first.dir().to_path_buf()));
    assert_eq!(entries.iter().filter(|p| *p == second.dir()).count(), 1);
    assert!(!first.dir().exists());
}

#[test]
fn test_retire_is_idempotent() {
    let root = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let target = fake_python(bin.path(), "python3.12");

    let publisher = ShimPublisher::new(root.path(), "s");
    let mut env = EnvSnapshot::from_pairs([(PATH_VAR, "/usr/bin")]);
    let set = publisher
        .publish(&target, PyVersion::new(3, 12), Placement::default(), &mut env)
        .unwrap();

    assert!(publisher.retire(set.dir(), &mut env).unwrap());
    assert!(!publisher.retire(set.dir(), &mut env).unwrap());
    assert_eq!(env.get(PATH_VAR), Some("/usr/bin"));
}

#[test]
fn test_publish_rejects_relative_or_missing_target() {
    let root = tempdir().unwrap();
    let publisher = ShimPublisher::new(root.path(), "s");
    let mut env = EnvSnapshot::default();

    for target in [Path::new("python3"), Path::new("/nonexistent/python3.12")] {
        let err = publisher
            .publish(target, PyVersion::new(3, 12), Placement::default(), &mut env)
            .unwrap_err();
        assert!(matches!(err, pysel_shim::Error::InvalidTarget(_)));
    }
    assert!(!env.has_changes());
}

#[test]
fn test_sessions_are_isolated() {
    let root = tempdir().unwrap();
    let bin = tempdir().unwrap();
    let target = fake_python(bin.path(), "python3.12");

    let a = ShimPublisher::new(root.path(), "a");
    let b = ShimPublisher::new(root.path(), "b");
    let mut env_a = EnvSnapshot::default();
    let mut env_b = EnvSnapshot::default();

    let set_a = a.publish(&target, PyVersion::new(3, 12), Placement::default(), &mut env_a).unwrap();
    let set_b = b.publish(&target, PyVersion::new(3, 12), Placement::default(), &mut env_b).unwrap();
    assert_ne!(set_a.dir(), set_b.dir());

    a.retire(set_a.dir(), &mut env_a).unwrap();
    assert!(set_b.dir().join("python").exists());
}
