//! # tmx CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tmx_cli::matrix::{run_matrix, MatrixArgs};
use tmx_cli::stages::{run_resolve, run_stages, ResolveArgs, StagesArgs};

/// Brokerage transaction engine CLI.
///
/// Inspects the stage catalog and the document request lifecycle without a
/// running server.
#[derive(Parser, Debug)]
#[command(name = "tmx", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the ordered stages for a transaction side.
    Stages(StagesArgs),

    /// Resolve a stored stage value against a side's catalog.
    Resolve(ResolveArgs),

    /// Print the document request lifecycle matrix.
    Matrix(MatrixArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("tmx CLI starting");

    let result = match cli.command {
        Commands::Stages(args) => run_stages(&args),
        Commands::Resolve(args) => run_resolve(&args),
        Commands::Matrix(args) => run_matrix(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
