//! CLI command implementations for memscan.
//!
//! This module provides implementations for all CLI subcommands:
//! - `scan`: Run a parameter document against live processes
//! - `validate`: Validate a parameter document without scanning
//! - `check`: Host readiness check

pub mod check;
pub mod scan;
pub mod validate;

// Re-export command functions
pub use check::command_check;
pub use scan::command_scan;
pub use validate::command_validate;
