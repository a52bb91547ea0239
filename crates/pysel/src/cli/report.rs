use crate::ui::table::{FormatConfig, Formatter};
use anyhow::{Result, anyhow};
use clap::Args;
use pysel_engine::{Context, Engine, StatusSummary};
use serde_json::json;
use std::io::Write;
use std::process::ExitCode;
use tabled::Tabled;

#[derive(Debug, Args)]
pub struct WhichArg {
    #[arg(required = true)]
    pub commands: Vec<String>,
    #[arg(long)]
    pub json:     bool,
}

#[derive(Debug, Args)]
pub struct DebugArg {
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatusArg {}

pub fn which(arg: WhichArg, engine: &mut Engine) -> Result<ExitCode> {
    let ctx = require(engine)?;
    let reports = ctx.which(&arg.commands);
    if arg.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{report}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn debug(arg: DebugArg, engine: &mut Engine) -> Result<ExitCode> {
    let reason = engine.unavailable_reason().map(str::to_string);
    let Some(ctx) = engine.context_mut() else {
        let reason = reason.unwrap_or_default();
        if arg.json {
            println!("{}", json!({ "engine_available": false, "reason": reason }));
        } else {
            println!("engine available: false ({reason})");
        }
        return Ok(ExitCode::SUCCESS);
    };

    let dump = ctx.state_dump();
    if arg.json {
        println!("{}", dump.to_json()?);
    } else {
        print!("{dump}");
    }
    Ok(ExitCode::SUCCESS)
}

pub fn status(_arg: StatusArg, engine: &mut Engine) -> Result<ExitCode> {
    let ctx = require(engine)?;
    print_status(ctx, &mut std::io::stdout().lock())?;
    Ok(ExitCode::SUCCESS)
}

fn require(engine: &mut Engine) -> Result<&mut Context> {
    let reason = engine.unavailable_reason().map(str::to_string);
    engine
        .context_mut()
        .ok_or_else(|| anyhow!("engine unavailable: {}", reason.unwrap_or_default()))
}

#[derive(Tabled)]
struct VersionRow {
    #[tabled(rename = "")]
    marker:  &'static str,
    version: String,
    release: String,
    path:    String,
}

pub fn print_status(ctx: &mut Context, out: &mut impl Write) -> Result<()> {
    let StatusSummary {
        environment,
        override_state,
        catalog,
    } = ctx.status();

    match &environment.root {
        Some(root) => writeln!(out, "environment: {} at {}", environment.kind, root.display())?,
        None => writeln!(out, "environment: none")?,
    }
    match override_state.version {
        Some(version) => {
            let mode = if override_state.build_mode { " [build mode]" } else { "" };
            writeln!(out, "override:    {version}{mode}")?;
        }
        None => writeln!(out, "override:    none")?,
    }

    if catalog.is_empty() {
        writeln!(out, "no interpreters found")?;
        return Ok(());
    }
    let rows = catalog.iter().map(|record| VersionRow {
        marker:  if override_state.version == Some(record.version) { "*" } else { "" },
        version: record.version.to_string(),
        release: record.version_string.clone(),
        path:    record.path.display().to_string(),
    });
    let table = Formatter::table(
        rows,
        FormatConfig {
            header: Some(format!("{} interpreters", catalog.len())),
            footer: override_state.version.map(|_| "* session override".to_string()),
        },
    );
    writeln!(out, "{table}")?;
    Ok(())
}
