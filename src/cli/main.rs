//! `schema-toolkit` command line

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod commands;
mod error;
mod logging;

use crate::commands::prepare::{PrepareArgs, handle_prepare};
use crate::commands::render::{RenderArgs, handle_render};
use crate::logging::{LogConfig, LogFormat, init_logging};

#[derive(Parser)]
#[command(
    name = "schema-toolkit",
    version,
    about = "Infer schema contracts from tabular data and render encoded datetimes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer a schema contract from a data file
    Prepare(PrepareArgs),
    /// Render epoch-ns datetime columns using a schema contract
    Render(RenderArgs),
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Prepare(args) => handle_prepare(&args)
            .with_context(|| format!("prepare failed for {}", args.data.display())),
        Commands::Render(args) => handle_render(&args)
            .with_context(|| format!("render failed for {}", args.data.display())),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_ansi(io::stderr().is_terminal());
    init_logging(&log_config);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
