use crate::cli::app::{App, Commands, Global};
use anyhow::Result;
use pysel_engine::{Context, Engine};
use pysel_platform::shell::{self, Shell};
use std::process::ExitCode;

pub mod app;
pub mod report;
pub mod run;
pub mod setpy;
pub mod setup;

/// Exit status of every blocked command.
pub const BLOCKED: u8 = 1;

impl Global {
    pub fn engine(&self) -> Engine {
        let mut builder = Context::builder().interactive(!self.non_interactive);
        if let Some(session) = &self.session {
            builder = builder.session(session.clone());
        }
        Engine::init(builder)
    }

    pub fn shell(&self) -> Shell { self.shell.or_else(shell::detect).unwrap_or(Shell::Unknown) }
}

pub fn dispatch(app: App) -> Result<ExitCode> {
    let global = app.global;
    match app.cmd {
        Commands::Run(arg) => run::run(arg, &mut global.engine()),
        Commands::Setpy(arg) => setpy::setpy(arg, &mut global.engine(), global.shell()),
        Commands::Which(arg) => report::which(arg, &mut global.engine()),
        Commands::Debug(arg) => report::debug(arg, &mut global.engine()),
        Commands::Status(arg) => report::status(arg, &mut global.engine()),
        Commands::Completions(arg) => setup::completions(arg),
    }
}
