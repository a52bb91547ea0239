use crate::cli::report::{DebugArg, StatusArg, WhichArg};
use crate::cli::run::RunArg;
use crate::cli::setpy::SetpyArg;
use crate::cli::setup::CompletionsArg;
use clap::{Args, Parser, Subcommand};
use pysel_platform::shell::Shell;

#[derive(Debug, Parser)]
#[command(name = "pysel", version = env!("CARGO_PKG_VERSION"), about, long_about = None, propagate_version = true)]
pub struct App {
    #[command(flatten)]
    pub global: Global,
    #[command(subcommand)]
    pub cmd:    Commands,
}

#[derive(Debug, Clone, Args)]
pub struct Global {
    /// Session id owning the override state; defaults to the parent process id
    #[arg(long, global = true)]
    pub session:         Option<String>,
    /// Shell syntax for export scripts; detected when omitted
    #[arg(long, global = true)]
    pub shell:           Option<Shell>,
    /// The calling shell is not interactive (`$-` has no `i`); defers to system commands
    #[arg(long, global = true)]
    pub non_interactive: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run python/pip through the resolver
    #[command(alias = "r", name = "run", disable_help_flag = true, disable_version_flag = true)]
    Run(RunArg),
    /// Set or clear the session override; prints a script for the shell to eval
    #[command(name = "setpy")]
    Setpy(SetpyArg),
    /// Show what commands would run, without running them
    #[command(alias = "w", name = "which")]
    Which(WhichArg),
    /// Dump the complete resolver state
    #[command(name = "debug")]
    Debug(DebugArg),
    /// Summarize environment, override and discovered interpreters
    #[command(alias = "st", name = "status")]
    Status(StatusArg),
    /// Generate shell completions
    #[command(name = "completions")]
    Completions(CompletionsArg),
}
