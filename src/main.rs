//! restcheck - scenario-driven end-to-end tests for REST APIs
//!
//! Runs ordered suites of HTTP scenarios against a live service, threading
//! state between them, and reports every case as passed, failed or errored.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use restcheck::{cli, commands, common::logging};

#[derive(Parser)]
#[command(name = "restcheck", about = "Scenario-driven REST API test runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Debug-level logging for restcheck
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write logs to a file (default location when no path is given)
    #[arg(long, global = true, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_file = match cli.log_file {
        Some(Some(path)) => Some(path),
        Some(None) => logging::default_log_path(),
        None => None,
    };
    let guard = logging::init_cli(
        cli.verbose || cli.command.traces_http(),
        log_file.as_deref(),
    );

    let code = match cli::dispatch(cli.command).await {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };

    // Flush the file log before exiting
    drop(guard);
    std::process::exit(code);
}
