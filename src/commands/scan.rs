//! Scan command implementation.
//!
//! Reads a parameter document, validates it, runs the engine, and prints
//! the report.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::cli::OutputFormat;
use crate::config::{Config, EngineConfig};
use crate::engine::run_scan;
use crate::params::SearchRequest;
use crate::results::render;

/// Runs the searches in `params` against every live process.
pub fn command_scan(
    params: Option<PathBuf>,
    only_found: bool,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let raw = read_params(params)?;
    let request: SearchRequest = serde_json::from_str(&raw)?;
    request.validate()?;

    info!(
        "running {} search(es) on host {}",
        request.searches.len(),
        crate::module::HOST.hostname
    );

    let engine_config = EngineConfig::from_config(config);
    let results = run_scan(&request, &engine_config);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => {
            for line in render(&results, only_found) {
                println!("{line}");
            }
            if !only_found {
                let s = &results.statistics;
                println!(
                    "{} hit(s) across {} process(es) scanned, {} failed, in {}",
                    s.totalhits, s.processes_scanned, s.processes_failed, s.exectime
                );
            }
        }
    }

    if !results.success {
        bail!("scan did not complete: {}", results.errors.join("; "));
    }
    Ok(())
}

/// Reads the parameter document from a file, or stdin when none is given.
fn read_params(params: Option<PathBuf>) -> Result<String> {
    match params {
        Some(path) => {
            fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))
        }
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}
