use std::path::PathBuf;

pub fn user_home() -> Option<PathBuf> {
    home::home_dir()
}

/// Per-user executable directory (`~/.local/bin`).
pub fn user_local_bin() -> Option<PathBuf> {
    user_home().map(|h| h.join(".local").join("bin"))
}

pub fn user_temp() -> PathBuf {
    std::env::temp_dir()
}

/// Scratch directory for `app` that no other user shares.
///
/// `$XDG_RUNTIME_DIR/<app>` when the login session provides one, otherwise
/// `<tmp>/<app>-<uid>`. The temp dir on Windows is already per user.
pub fn user_runtime(app: &str) -> PathBuf {
    #[cfg(unix)]
    {
        if let Some(runtime) = std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from)
            && runtime.is_absolute()
        {
            return runtime.join(app);
        }
        user_temp().join(format!("{app}-{}", nix::unistd::getuid()))
    }

    #[cfg(not(unix))]
    {
        user_temp().join(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_temp_is_absolute() {
        assert!(user_temp().is_absolute());
    }

    #[test]
    fn test_user_runtime_is_per_user() {
        let dir = user_runtime("pysel");
        assert!(dir.is_absolute());
        #[cfg(unix)]
        if std::env::var_os("XDG_RUNTIME_DIR").is_none() {
            assert!(dir.ends_with(format!("pysel-{}", nix::unistd::getuid())));
        }
    }

    #[test]
    fn test_user_local_bin_under_home() {
        if let (Some(home), Some(bin)) = (user_home(), user_local_bin()) {
            assert!(bin.starts_with(&home));
            assert!(bin.ends_with(".local/bin"));
        }
    }
}
