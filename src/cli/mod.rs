//! CLI command handling
//!
//! Assembles suites, runs them and formats output.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::commands::Commands;
use crate::common::config::Config;
use crate::common::{paths, Error, Result};
use crate::http::HttpClient;
use crate::suites::{self, SuiteOptions};
use crate::testing::{ConsoleReporter, Reporter, Runner, SilentReporter, Suite, SuiteFile};

/// Dispatch a CLI command
///
/// Returns whether every case passed; commands that run nothing report
/// success once they complete.
pub async fn dispatch(command: Commands) -> Result<bool> {
    match command {
        Commands::Run {
            suites,
            files,
            base_url,
            config,
            json,
            trace_http,
        } => {
            let config = load_config(config.as_deref())?;
            let base_url = base_url.unwrap_or_else(|| config.target.base_url.clone());
            let client = HttpClient::from_config(&base_url, &config.http)?
                .with_trace(trace_http || config.http.trace);
            let suite = assemble(&suites, &files, &client, &SuiteOptions::from(&config.suites))?;

            info!(base_url = %client.base_url(), suite = %suite.name(), "running");

            let reporter: Box<dyn Reporter> = if json {
                Box::new(SilentReporter)
            } else {
                Box::new(ConsoleReporter)
            };
            let mut runner = Runner::new(reporter);
            let report = runner.run_suite(&suite).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(report.is_success())
        }

        Commands::Check {
            suites,
            files,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let client = HttpClient::from_config(&config.target.base_url, &config.http)?;
            let suite = assemble(&suites, &files, &client, &SuiteOptions::from(&config.suites))?;
            suite.validate()?;

            println!(
                "{}: {} endpoints, {} scenarios OK",
                suite.name(),
                suite.endpoint_list().len(),
                suite.scenario_count()
            );
            Ok(true)
        }

        Commands::List => {
            let client = HttpClient::new(&Config::default().target.base_url)?;
            let options = SuiteOptions::default();
            for name in suites::NAMES {
                let suite = suites::suite(name, &client, &options)?;
                println!("{}", name);
                print_suite(&suite);
            }
            Ok(true)
        }

        Commands::Config { path, config } => {
            if path {
                match config.or_else(paths::config_path) {
                    Some(path) => println!("{}", path.display()),
                    None => {
                        return Err(Error::Config(
                            "Could not determine configuration directory".to_string(),
                        ))
                    }
                }
            } else {
                let config = load_config(config.as_deref())?;
                print!("{}", config.to_toml()?);
            }
            Ok(true)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Combine built-in suites and suite files into one run
///
/// Built-in suites come first so files can read the state they leave behind.
/// Without suite names, every built-in suite runs unless files were given.
fn assemble(
    names: &[String],
    files: &[PathBuf],
    client: &HttpClient,
    options: &SuiteOptions,
) -> Result<Suite> {
    let mut loaded = Vec::with_capacity(files.len());
    for path in files {
        debug!(path = %path.display(), "loading suite file");
        loaded.push(SuiteFile::load(path)?.into_suite(client)?);
    }

    let mut suite = if names.is_empty() && !loaded.is_empty() {
        let name = loaded
            .iter()
            .map(|s| s.name().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Suite::new(name)
    } else {
        suites::build(names, client, options)?
    };

    for file_suite in loaded {
        suite = suite.merge(file_suite);
    }
    Ok(suite)
}

fn print_suite(suite: &Suite) {
    for endpoint in suite.endpoint_list() {
        println!("  {}", endpoint.label());
        for scenario in endpoint.scenarios() {
            println!("    {}", scenario.description());
            for label in scenario.case_labels() {
                println!("      - {}", label);
            }
        }
    }
}
