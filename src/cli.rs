//! CLI arguments and subcommands for memscan.
//!
//! This module defines the command-line interface structure using the clap
//! library, including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Output format for scan results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report lines
    Text,
    /// The raw result document
    Json,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "memscan",
    about = "Scans live process memory, loaded libraries, and process names for indicators",
    long_about = "Scans live process memory, loaded libraries, and process names for indicators.\n\n\
                  Takes a JSON search document (names, library regexes, hex byte sequences, \
                  content regexes per search), probes every running process, and reports what \
                  matched where. Built to run unattended on investigated hosts: per-process \
                  access failures never abort a run.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Worker threads for the process fan-out
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Probe at most N processes per run
    #[arg(long)]
    pub max_processes: Option<usize>,

    /// Memory read chunk size (KB)
    #[arg(long)]
    pub chunk_kb: Option<usize>,

    /// Per-process probe time budget (seconds)
    #[arg(long)]
    pub process_timeout_secs: Option<u64>,

    /// Whole-run deadline (seconds, 0 disables)
    #[arg(long)]
    pub run_timeout_secs: Option<u64>,

    /// Scanned-bytes cap per process for searches without maxlength (0 = unbounded)
    #[arg(long)]
    pub max_scan_bytes: Option<u64>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run searches from a parameter document against all live processes
    Scan {
        /// Parameter document (JSON); reads stdin when omitted
        params: Option<PathBuf>,

        /// Print only a single summary line when anything matched
        #[arg(long)]
        only_found: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a parameter document without scanning
    Validate {
        /// Parameter document (JSON); reads stdin when omitted
        params: Option<PathBuf>,
    },

    /// Check that this host can be scanned (permissions, /proc, Yama)
    Check,
}
