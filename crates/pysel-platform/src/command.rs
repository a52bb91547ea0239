use crate::env::EnvChange;
use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::process::{Command as StdCommand, Output, Stdio};

#[derive(Debug)]
pub struct Command {
    inner:   StdCommand,
    program: String,
}

impl Command {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        let program = program.as_ref();
        Self {
            inner:   StdCommand::new(program),
            program: program.to_string_lossy().into_owned(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.inner.arg(arg);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.inner.args(args);
        self
    }

    pub fn env<K, V>(mut self, key: K, val: V) -> Self
    where
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        self.inner.env(key, val);
        self
    }

    /// Apply recorded environment changes on top of the inherited environment.
    pub fn changes<'a>(mut self, changes: impl IntoIterator<Item = &'a EnvChange>) -> Self {
        for change in changes {
            match change {
                EnvChange::Set(k, v) => {
                    self.inner.env(k, v);
                }
                EnvChange::Unset(k) => {
                    self.inner.env_remove(k);
                }
            }
        }
        self
    }

    pub fn program(&self) -> &str { &self.program }

    /// Run to completion with captured stdout/stderr and no stdin.
    pub fn capture(mut self) -> Result<Output> {
        self.inner.stdin(Stdio::null());
        self.inner.output().map_err(|e| spawn_error(&self.program, e))
    }

    /// Run to completion with inherited stdio and return its exit code.
    ///
    /// A child killed by a signal reports `128 + signal`, as shells do.
    pub fn status(mut self) -> Result<i32> {
        let status = self.inner.status().map_err(|e| spawn_error(&self.program, e))?;
        if let Some(code) = status.code() {
            return Ok(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Ok(128 + signal);
            }
        }

        Ok(1)
    }

    /// Replace the current process with the command.
    ///
    /// Only returns on failure. Where `exec(2)` is unavailable the child is
    /// waited on and the current process exits with its status.
    pub fn exec(self) -> Error {
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;

            let mut this = self;
            let err = this.inner.exec();
            spawn_error(&this.program, err)
        }

        #[cfg(not(unix))]
        {
            match self.status() {
                Ok(code) => std::process::exit(code),
                Err(e) => e,
            }
        }
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> Error {
    match err.kind() {
        ErrorKind::NotFound => Error::CommandNotFound {
            cmd: program.to_string(),
        },
        ErrorKind::PermissionDenied => Error::NotExecutable {
            cmd: program.to_string(),
        },
        _ => Error::CommandFailed {
            cmd:    program.to_string(),
            source: err,
        },
    }
}
