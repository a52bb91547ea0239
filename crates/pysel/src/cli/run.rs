use crate::cli::BLOCKED;
use anyhow::Result;
use clap::Args;
use pysel_engine::{Action, Engine, EngineError, Invocation, LogicalCommand};
use pysel_platform::command::Command;
use pysel_platform::env::EnvChange;
use std::process::ExitCode;

#[derive(Debug, Args)]
pub struct RunArg {
    /// python, python3, python3.X, pip, pip3 or pip3.X
    pub command: String,
    /// Arguments passed through untouched
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args:    Vec<String>,
}

/// Resolve and replace this process with the chosen program.
///
/// Only returns when nothing could be launched or the command was blocked.
pub fn run(arg: RunArg, engine: &mut Engine) -> Result<ExitCode> {
    let Some(ctx) = engine.context_mut() else {
        return Ok(finish(launch(&Invocation::new(&arg.command, &arg.args), &[])));
    };

    let action = match ctx.resolve_name(&arg.command, &arg.args) {
        Ok(action) => action,
        Err(EngineError::InvalidCommand(name)) => {
            tracing::debug!(command = %name, "not a managed command; running it as is");
            let inv = Invocation::new(&arg.command, &arg.args);
            return Ok(finish(launch(&inv, &ctx.env().changes())));
        }
        Err(err) => return Err(err.into()),
    };
    let changes = ctx.env().changes();

    match action {
        Action::Block(reason) => {
            eprintln!("pysel: {reason}");
            Ok(ExitCode::from(BLOCKED))
        }
        Action::RunPath(inv) | Action::RunBuildMode(inv) => Ok(finish(launch(&inv, &changes))),
        Action::RunSystem(inv) => {
            let err = launch(&inv, &ctx.system_changes());
            if !matches!(err.exit_code(), Some(126 | 127)) {
                return Ok(finish(err));
            }
            let fallback = LogicalCommand::parse(&arg.command)
                .ok()
                .and_then(|command| ctx.fallback_after_system_failure(&command, &arg.args));
            match fallback {
                Some(inv) => Ok(finish(launch(&inv, &changes))),
                None => Ok(finish(err)),
            }
        }
    }
}

fn launch(inv: &Invocation, changes: &[EnvChange]) -> pysel_platform::Error {
    tracing::debug!(program = %inv.program.display(), args = ?inv.args, "exec");
    Command::new(&inv.program).args(&inv.args).changes(changes).exec()
}

fn finish(err: pysel_platform::Error) -> ExitCode {
    eprintln!("pysel: {err}");
    let code = err.exit_code().and_then(|c| u8::try_from(c).ok()).unwrap_or(1);
    ExitCode::from(code)
}
