//! Module boundary for the investigation framework.
//!
//! The framework addresses engines by a stable identifier and exchanges
//! serialized documents with them. This module exposes the one entry point
//! that contract needs: registration is an explicit table built at process
//! start, never mutated afterwards, and the entry function maps a raw
//! parameter payload to a raw result payload without ever panicking out.

use std::fs;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::config::EngineConfig;
use crate::engine::run_scan;
use crate::params::SearchRequest;
use crate::results::Results;

/// Identifier the framework uses to look up this engine.
pub const MODULE_NAME: &str = "memory";

/// An engine entry point: serialized parameters in, serialized results out.
pub type ModuleEntry = fn(&str) -> String;

static REGISTRY: Lazy<AHashMap<&'static str, ModuleEntry>> = Lazy::new(|| {
    let mut table = AHashMap::new();
    table.insert(MODULE_NAME, run as ModuleEntry);
    table
});

/// The registration table. Built on first access, read-only afterwards.
pub fn registry() -> &'static AHashMap<&'static str, ModuleEntry> {
    &REGISTRY
}

/// Identity of the host this engine runs on, captured once at module load.
#[derive(Debug, Clone)]
pub struct HostIdentity {
    pub hostname: String,
    pub kernel: String,
}

/// Read-only after initialization; the engine holds no other process-wide
/// state between runs.
pub static HOST: Lazy<HostIdentity> = Lazy::new(|| HostIdentity {
    hostname: nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string()),
    kernel: fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string()),
});

/// The registered entry point: decode, validate, scan, encode.
///
/// Every failure mode is folded into a serialized [`Results`] with
/// `success=false`; the framework always gets a well-formed document back.
pub fn run(raw_parameters: &str) -> String {
    debug!(
        "module '{}' invoked on host {}",
        MODULE_NAME,
        HOST.hostname
    );

    let request: SearchRequest = match serde_json::from_str(raw_parameters) {
        Ok(r) => r,
        Err(e) => return serialize(&Results::fatal(format!("cannot decode parameters: {e}"))),
    };
    if let Err(e) = request.validate() {
        return serialize(&Results::fatal(format!("invalid parameters: {e}")));
    }

    let results = run_scan(&request, &EngineConfig::default());
    serialize(&results)
}

fn serialize(results: &Results) -> String {
    serde_json::to_string(results).unwrap_or_else(|e| {
        // A plain struct of strings and integers does not fail to encode;
        // if it ever does, still hand the framework valid JSON.
        format!(
            r#"{{"success":false,"foundanything":false,"searches":{{}},"statistics":{{}},"errors":["cannot encode results: {e}"]}}"#
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_is_registered() {
        assert!(registry().contains_key(MODULE_NAME));
    }

    #[test]
    fn test_host_identity_initialized() {
        assert!(!HOST.hostname.is_empty());
        assert!(!HOST.kernel.is_empty());
    }

    #[test]
    fn test_run_rejects_undecodable_payload() {
        let out = run("this is not json");
        let results: Results = serde_json::from_str(&out).unwrap();
        assert!(!results.success);
        assert!(!results.foundanything);
        assert!(results.errors[0].contains("cannot decode parameters"));
    }

    #[test]
    fn test_run_rejects_invalid_parameters() {
        let out = run(r#"{"searches":{"":{"names":["foo"]}}}"#);
        let results: Results = serde_json::from_str(&out).unwrap();
        assert!(!results.success);
        assert!(results.errors[0].contains("invalid parameters"));
    }
}
