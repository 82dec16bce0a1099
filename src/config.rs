//! Configuration management for memscan.
//!
//! This module handles loading, merging, and validating engine tuning from
//! files and CLI arguments. It supports YAML, JSON, and TOML formats. None
//! of these knobs change what a scan finds; they bound how much time and
//! memory a run may spend finding it.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cli::{Args, ConfigFormat};

// Default configuration constants
pub const DEFAULT_CHUNK_KB: usize = 4096;
pub const DEFAULT_PROCESS_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;
/// Content matches longer than this overlap can be missed at chunk seams.
pub const DEFAULT_CONTENT_OVERLAP: usize = 4096;

/// Engine tuning configuration, as read from file/CLI (all optional).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Worker threads for the process fan-out; None lets rayon decide.
    pub parallelism: Option<usize>,
    /// Hard cap on how many processes one run probes.
    pub max_processes: Option<usize>,
    /// Memory read chunk size in KB.
    #[serde(alias = "chunk-kb")]
    pub chunk_kb: Option<usize>,
    /// Per-process probe time budget in seconds.
    #[serde(alias = "process-timeout-secs")]
    pub process_timeout_secs: Option<u64>,
    /// Whole-run deadline in seconds; 0 disables it.
    #[serde(alias = "run-timeout-secs")]
    pub run_timeout_secs: Option<u64>,
    /// Cap on scanned bytes per process when a search leaves maxlength at 0;
    /// 0 means unbounded.
    #[serde(alias = "max-scan-bytes")]
    pub max_scan_bytes: Option<u64>,

    // Logging
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallelism: None,
            max_processes: None,
            chunk_kb: Some(DEFAULT_CHUNK_KB),
            process_timeout_secs: Some(DEFAULT_PROCESS_TIMEOUT_SECS),
            run_timeout_secs: Some(DEFAULT_RUN_TIMEOUT_SECS),
            max_scan_bytes: Some(0),
            log_level: Some("info".into()),
        }
    }
}

/// Fully-resolved engine settings handed to a scan run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_processes: Option<usize>,
    pub chunk_bytes: usize,
    pub content_overlap: usize,
    pub process_timeout: Duration,
    /// None disables the whole-run deadline.
    pub run_timeout: Option<Duration>,
    pub max_scan_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::from_config(&Config::default())
    }
}

impl EngineConfig {
    /// Resolves optional config fields into concrete engine settings.
    pub fn from_config(cfg: &Config) -> Self {
        let run_secs = cfg.run_timeout_secs.unwrap_or(DEFAULT_RUN_TIMEOUT_SECS);
        EngineConfig {
            max_processes: cfg.max_processes,
            chunk_bytes: cfg.chunk_kb.unwrap_or(DEFAULT_CHUNK_KB) * 1024,
            content_overlap: DEFAULT_CONTENT_OVERLAP,
            process_timeout: Duration::from_secs(
                cfg.process_timeout_secs
                    .unwrap_or(DEFAULT_PROCESS_TIMEOUT_SECS),
            ),
            run_timeout: (run_secs > 0).then(|| Duration::from_secs(run_secs)),
            max_scan_bytes: cfg.max_scan_bytes.unwrap_or(0),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if let Some(chunk_kb) = cfg.chunk_kb {
        if chunk_kb == 0 {
            bail!("chunk_kb must be greater than 0");
        }
    }
    if let Some(secs) = cfg.process_timeout_secs {
        if secs == 0 {
            bail!(
                "process_timeout_secs must be greater than 0 \
                (use run_timeout_secs = 0 to disable the overall deadline)"
            );
        }
    }
    if let Some(parallelism) = cfg.parallelism {
        if parallelism > 512 {
            bail!("parallelism {} is not sensible", parallelism);
        }
    }
    if let Some(max) = cfg.max_processes {
        if max == 0 {
            bail!("max_processes must be greater than 0 when set");
        }
    }
    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref().and_then(|p| p.to_str()))?
    };

    if args.parallelism.is_some() {
        config.parallelism = args.parallelism;
    }
    if args.max_processes.is_some() {
        config.max_processes = args.max_processes;
    }
    if args.chunk_kb.is_some() {
        config.chunk_kb = args.chunk_kb;
    }
    if args.process_timeout_secs.is_some() {
        config.process_timeout_secs = args.process_timeout_secs;
    }
    if args.run_timeout_secs.is_some() {
        config.run_timeout_secs = args.run_timeout_secs;
    }
    if args.max_scan_bytes.is_some() {
        config.max_scan_bytes = args.max_scan_bytes;
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&str>) -> Result<Config> {
    let path = if let Some(p) = path {
        PathBuf::from(p)
    } else {
        // Try default locations
        let defaults = [
            "/etc/memscan/memscan.yaml",
            "/etc/memscan/memscan.yml",
            "/etc/memscan/memscan.json",
            "./memscan.yaml",
            "./memscan.yml",
            "./memscan.json",
        ];

        defaults
            .iter()
            .find(|p| Path::new(p).exists())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(""))
    };

    if !path.exists() || path.to_string_lossy().is_empty() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<()> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_effective_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let cfg = Config {
            chunk_kb: Some(0),
            ..Default::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_engine_config_resolution() {
        let cfg = Config {
            chunk_kb: Some(64),
            run_timeout_secs: Some(0),
            ..Default::default()
        };
        let engine = EngineConfig::from_config(&cfg);
        assert_eq!(engine.chunk_bytes, 64 * 1024);
        assert!(engine.run_timeout.is_none());
        assert_eq!(engine.max_scan_bytes, 0);
    }

    #[test]
    fn test_load_yaml_config_file() {
        let mut f = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(f, "chunk_kb: 128\nprocess_timeout_secs: 5").unwrap();
        let cfg = load_config(f.path().to_str()).unwrap();
        assert_eq!(cfg.chunk_kb, Some(128));
        assert_eq!(cfg.process_timeout_secs, Some(5));
        // Unset fields stay unset; resolution fills defaults later.
        assert_eq!(cfg.max_processes, None);
    }

    #[test]
    fn test_load_json_config_file() {
        let mut f = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        writeln!(f, r#"{{"max_processes": 10, "run_timeout_secs": 60}}"#).unwrap();
        let cfg = load_config(f.path().to_str()).unwrap();
        assert_eq!(cfg.max_processes, Some(10));
        assert_eq!(cfg.run_timeout_secs, Some(60));
    }
}
