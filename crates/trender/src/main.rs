//! trender CLI - template renderer with live reload.
//!
//! Provides commands for:
//! - `serve`: Render, watch the sources and serve the page with live reload
//! - `render`: Render once and exit

mod commands;
mod error;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{RenderArgs, ServeArgs};
use error::CliError;
use output::Output;

/// trender - render a template against JSON data.
#[derive(Parser)]
#[command(name = "trender", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render, then serve the page and re-render when sources change.
    Serve(ServeArgs),
    /// Render once and exit.
    Render(RenderArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Serve(args) => args.source.verbose,
            Self::Render(args) => args.source.verbose,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables DEBUG level, otherwise use RUST_LOG or default to INFO
    let filter = if cli.command.verbose() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Serve(args) => run_async(args),
        Commands::Render(args) => args.execute(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}

fn run_async(args: ServeArgs) -> Result<(), CliError> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(args.execute())
}
