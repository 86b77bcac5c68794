//! CLI command definitions
//!
//! Defines the clap commands for the restcheck CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run suites against the API under test
    Run {
        /// Built-in suites to run (default: all, unless --file is given)
        suites: Vec<String>,

        /// YAML suite file to run after the built-in suites
        /// Can be specified multiple times: --file a.yaml --file b.yaml
        #[arg(long = "file", short = 'f')]
        files: Vec<PathBuf>,

        /// Base URL of the API, overriding the configuration
        #[arg(long)]
        base_url: Option<String>,

        /// Configuration file to use instead of the default one
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the report as JSON instead of progress output
        #[arg(long)]
        json: bool,

        /// Log every HTTP request and response
        #[arg(long)]
        trace_http: bool,
    },

    /// Check that suites assemble without sending any request
    Check {
        /// Built-in suites to check (default: all, unless --file is given)
        suites: Vec<String>,

        /// YAML suite file to check
        #[arg(long = "file", short = 'f')]
        files: Vec<PathBuf>,

        /// Configuration file to use instead of the default one
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List built-in suites with their endpoints and scenarios
    #[command(alias = "ls")]
    List,

    /// Show the effective configuration
    Config {
        /// Print the configuration file path instead
        #[arg(long)]
        path: bool,

        /// Configuration file to use instead of the default one
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Commands {
    /// Whether HTTP tracing was requested, which needs debug-level logs
    pub fn traces_http(&self) -> bool {
        matches!(self, Self::Run { trace_http: true, .. })
    }
}
