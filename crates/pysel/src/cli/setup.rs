use crate::cli::app::App;
use anyhow::{Result, bail};
use clap::{Args, CommandFactory};
use clap_complete::{Shell, generate};
use pysel_platform::shell;
use std::process::ExitCode;

#[derive(Args, Clone, Debug)]
pub struct CompletionsArg {
    /// Shell to generate for; detected when omitted
    #[arg(id = "completion_shell", value_name = "SHELL")]
    shell: Option<Shell>,
}

pub fn completions(arg: CompletionsArg) -> Result<ExitCode> {
    let shell = match arg.shell {
        Some(s) => s,
        None => match shell::detect() {
            Some(shell::Shell::Bash) => Shell::Bash,
            Some(shell::Shell::Zsh) => Shell::Zsh,
            Some(shell::Shell::Fish) => Shell::Fish,
            Some(shell::Shell::Elvish) => Shell::Elvish,
            Some(shell::Shell::Powershell | shell::Shell::Pwsh) => Shell::PowerShell,
            Some(other) => bail!("no completions for {other}; pass a shell explicitly"),
            None => bail!("could not detect the shell; pass one explicitly"),
        },
    };

    let mut cmd = App::command();
    generate(shell, &mut cmd, "pysel", &mut std::io::stdout());
    Ok(ExitCode::SUCCESS)
}
