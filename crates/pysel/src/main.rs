use clap::Parser;
use pysel_engine::DEBUG_VAR;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod ui;

fn main() -> ExitCode {
    init_logging();
    let app = cli::app::App::parse();

    match cli::dispatch(app) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("pysel: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout carries export scripts.
fn init_logging() {
    let debug_enabled = std::env::var(DEBUG_VAR)
        .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
