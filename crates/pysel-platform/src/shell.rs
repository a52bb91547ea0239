//! Shell detection and export-script rendering.

use crate::env::EnvChange;
use crate::error::Error;
pub use query_shell::Shell as QueryShell;
use std::fmt::Write as _;
use std::str::FromStr;

/// Shell types supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
    Pwsh,
    Cmd,
    Nushell,
    Elvish,
    Ion,
    Xonsh,
    Unknown,
}

fn from_query_shell(qs: QueryShell) -> Shell {
    match qs {
        QueryShell::Bash => Shell::Bash,
        QueryShell::Zsh => Shell::Zsh,
        QueryShell::Fish => Shell::Fish,
        QueryShell::Powershell => Shell::Powershell,
        QueryShell::Nushell => Shell::Nushell,
        QueryShell::Elvish => Shell::Elvish,
        QueryShell::Ion => Shell::Ion,
        QueryShell::Xonsh => Shell::Xonsh,
        _ => Shell::Unknown,
    }
}

/// Detect the shell that launched us.
///
/// Returns `None` if detection fails.
pub fn detect() -> Option<Shell> {
    query_shell::get_shell().ok().map(from_query_shell)
}

impl Shell {
    pub fn name(self) -> &'static str {
        match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::Powershell => "powershell",
            Shell::Pwsh => "pwsh",
            Shell::Cmd => "cmd",
            Shell::Nushell => "nu",
            Shell::Elvish => "elvish",
            Shell::Ion => "ion",
            Shell::Xonsh => "xonsh",
            Shell::Unknown => "sh",
        }
    }

    /// Render environment changes as a script this shell can evaluate.
    ///
    /// Unknown shells get POSIX syntax.
    pub fn render(self, changes: &[EnvChange]) -> String {
        let mut out = String::new();
        for change in changes {
            let _ = match (self, change) {
                (Shell::Fish, EnvChange::Set(k, v)) => writeln!(out, "set -gx {k} {};", fish_quote(v)),
                (Shell::Fish, EnvChange::Unset(k)) => writeln!(out, "set -e {k};"),

                (Shell::Powershell | Shell::Pwsh, EnvChange::Set(k, v)) => {
                    writeln!(out, "$env:{k} = {}", ps_quote(v))
                }
                (Shell::Powershell | Shell::Pwsh, EnvChange::Unset(k)) => {
                    writeln!(out, "Remove-Item Env:{k} -ErrorAction SilentlyContinue")
                }

                (Shell::Cmd, EnvChange::Set(k, v)) => writeln!(out, "set \"{k}={v}\""),
                (Shell::Cmd, EnvChange::Unset(k)) => writeln!(out, "set {k}="),

                (Shell::Nushell, EnvChange::Set(k, v)) => writeln!(out, "$env.{k} = {}", nu_quote(v)),
                (Shell::Nushell, EnvChange::Unset(k)) => writeln!(out, "hide-env -i {k}"),

                (Shell::Elvish, EnvChange::Set(k, v)) => writeln!(out, "set-env {k} {}", elvish_quote(v)),
                (Shell::Elvish, EnvChange::Unset(k)) => writeln!(out, "unset-env {k}"),

                (Shell::Xonsh, EnvChange::Set(k, v)) => writeln!(out, "${k} = {}", posix_quote(v)),
                (Shell::Xonsh, EnvChange::Unset(k)) => writeln!(out, "del ${k}"),

                (Shell::Ion, EnvChange::Set(k, v)) => writeln!(out, "export {k}={}", posix_quote(v)),
                (Shell::Ion, EnvChange::Unset(k)) => writeln!(out, "drop {k}"),

                (_, EnvChange::Set(k, v)) => writeln!(out, "export {k}={}", posix_quote(v)),
                (_, EnvChange::Unset(k)) => writeln!(out, "unset {k}"),
            };
        }
        out
    }
}

impl FromStr for Shell {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::Powershell,
            "pwsh" => Shell::Pwsh,
            "cmd" | "cmd.exe" => Shell::Cmd,
            "nu" | "nushell" => Shell::Nushell,
            "elvish" => Shell::Elvish,
            "ion" => Shell::Ion,
            "xonsh" => Shell::Xonsh,
            "sh" | "posix" | "dash" | "ksh" => Shell::Unknown,
            other => return Err(Error::UnknownShell(other.to_string())),
        })
    }
}

impl std::fmt::Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.name()) }
}

fn posix_quote(v: &str) -> String { format!("'{}'", v.replace('\'', r"'\''")) }

fn fish_quote(v: &str) -> String { format!("'{}'", v.replace('\\', r"\\").replace('\'', r"\'")) }

fn ps_quote(v: &str) -> String { format!("'{}'", v.replace('\'', "''")) }

/// Elvish single-quoted strings double an embedded quote.
fn elvish_quote(v: &str) -> String { format!("'{}'", v.replace('\'', "''")) }

fn nu_quote(v: &str) -> String { format!("\"{}\"", v.replace('\\', r"\\").replace('"', "\\\"")) }
