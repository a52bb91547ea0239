//! `setpy`: the only commands that change session state.
//!
//! The export script goes to stdout for the shell to evaluate; everything
//! meant for the user goes to stderr so it survives `eval "$(...)"`.

use crate::cli::report::print_status;
use anyhow::{Context as _, Result, anyhow};
use clap::{Args, Subcommand};
use pysel_engine::{ClearOutcome, Context, Engine};
use pysel_platform::shell::Shell;
use pysel_version::PyVersion;
use std::io::Write;
use std::process::ExitCode;

#[derive(Debug, Args)]
pub struct SetpyArg {
    #[command(subcommand)]
    pub action: Option<SetpyAction>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SetpyAction {
    /// Use <VERSION> for python/python3 in this session
    Set {
        /// Major.minor, e.g. 3.12
        #[arg(id = "py_version", value_name = "VERSION")]
        version: String,
        /// Also allow pip outside a virtual environment
        #[arg(long)]
        build:   bool,
    },
    /// Drop the override and build mode
    Clear,
    /// Show the current state (the default)
    Status,
}

pub fn setpy(arg: SetpyArg, engine: &mut Engine, shell: Shell) -> Result<ExitCode> {
    let reason = engine.unavailable_reason().map(str::to_string);
    let ctx = engine
        .context_mut()
        .ok_or_else(|| anyhow!("engine unavailable: {}", reason.unwrap_or_default()))?;

    match arg.action.unwrap_or(SetpyAction::Status) {
        SetpyAction::Set { version, build } => {
            let version: PyVersion = version.parse().with_context(|| format!("invalid version '{version}'"))?;
            let change = ctx.set_override(version, build)?;
            let mode = if change.build_mode { " [build mode]" } else { "" };
            eprintln!("python {} -> {}{mode}", change.version, change.path.display());
            emit(ctx, shell)?;
        }
        SetpyAction::Clear => match ctx.clear_override()? {
            ClearOutcome::NothingToClear => eprintln!("no override to clear"),
            ClearOutcome::Cleared { version, build_mode } => {
                let version = version.map_or_else(|| "-".to_string(), |v| v.to_string());
                let mode = if build_mode { " and build mode" } else { "" };
                eprintln!("cleared override {version}{mode}");
                emit(ctx, shell)?;
            }
        },
        SetpyAction::Status => print_status(ctx, &mut std::io::stderr())?,
    }
    Ok(ExitCode::SUCCESS)
}

fn emit(ctx: &Context, shell: Shell) -> Result<()> {
    let script = shell.render(&ctx.env().changes());
    let mut out = std::io::stdout().lock();
    out.write_all(script.as_bytes())?;
    out.flush()?;
    Ok(())
}
