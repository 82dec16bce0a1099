//! memscan - process memory indicator scanner
//!
//! This library scans the memory of running processes on a Linux host for
//! operator-specified indicators: literal process names, regular expressions
//! over loaded library names, raw byte sequences, and regular expressions
//! over live memory contents. It is built to be driven by a fleet
//! investigation framework: one serialized request in, one serialized result
//! document out, with per-process access failures isolated so a single
//! unreadable process never aborts a run.
//!
//! # Usage
//!
//! ```no_run
//! use memscan::config::EngineConfig;
//! use memscan::engine::run_scan;
//! use memscan::params::SearchRequest;
//! use memscan::results::render;
//!
//! let request: SearchRequest = serde_json::from_str(
//!     r#"{"searches":{"s1":{"names":["sshd"],"options":{"logfailures":true}}}}"#,
//! ).unwrap();
//! request.validate().unwrap();
//!
//! let results = run_scan(&request, &EngineConfig::default());
//! for line in render(&results, false) {
//!     println!("{line}");
//! }
//! ```
//!
//! Framework embedders use the registration table instead:
//! [`module::registry`] maps the stable module identifier to an entry point
//! taking and returning serialized documents.

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod matchers;
pub mod module;
pub mod params;
pub mod process;
pub mod results;
pub mod startup_checks;

// Re-export main types for convenience
pub use config::{Config, EngineConfig};
pub use engine::run_scan;
pub use params::{SearchRequest, ValidationError};
pub use results::{render, MatchElement, Results, SearchResult};
