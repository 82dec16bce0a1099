//! Validate command implementation.
//!
//! Parses and validates a parameter document, printing why it was rejected.
//! Nothing is scanned.

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::params::SearchRequest;

/// Validates a parameter document and exits.
pub fn command_validate(params: Option<PathBuf>) -> Result<()> {
    let raw = match params {
        Some(path) => fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            raw
        }
    };

    let request: SearchRequest = serde_json::from_str(&raw)?;
    match request.validate() {
        Ok(()) => {
            println!(
                "✅ parameters valid: {} search(es)",
                request.searches.len()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ parameters invalid: {e}");
            std::process::exit(1);
        }
    }
}
