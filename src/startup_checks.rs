//! Startup requirement validation for memscan.
//!
//! Reading other processes' memory needs more than a readable /proc: the
//! caller must hold ptrace-read rights over the target, which Yama can
//! restrict system-wide. These checks surface the host's posture before a
//! scan so an empty result is explainable.

use std::fs;
use std::path::Path;

use nix::unistd::geteuid;
use tracing::{debug, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements() -> Result<(), RequirementError> {
    info!("Validating runtime requirements...");

    check_user_privileges();
    check_proc_access()?;
    check_ptrace_scope();

    info!("Runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("Not running as root - memory of other users' processes will be unreadable");
        warn!("Those processes are reported as per-process failures, not fatal errors");
    } else {
        debug!("Running as root (uid=0)");
    }
}

/// Check /proc availability; without it no scan can run at all.
fn check_proc_access() -> Result<(), RequirementError> {
    if !Path::new("/proc").is_dir() {
        return Err(RequirementError::ProcUnavailable);
    }

    // Own maps must be readable for the self-probe; failure here means
    // /proc is mounted with something unusual (hidepid on everything).
    match fs::metadata("/proc/self/maps") {
        Ok(_) => {
            debug!("/proc/self/maps accessible");
            Ok(())
        }
        Err(e) => Err(RequirementError::ProcUnreadable(e.to_string())),
    }
}

/// Check the Yama ptrace scope; values above 1 block /proc/<pid>/mem reads
/// of non-child processes even for root without CAP_SYS_PTRACE.
fn check_ptrace_scope() {
    let path = "/proc/sys/kernel/yama/ptrace_scope";
    match fs::read_to_string(path) {
        Ok(v) => {
            let scope = v.trim();
            match scope {
                "0" | "1" => debug!("yama ptrace_scope={}", scope),
                _ => {
                    warn!(
                        "yama ptrace_scope={} - cross-process memory reads will fail",
                        scope
                    );
                    warn!("Solution: sysctl kernel.yama.ptrace_scope=1 for the scan window");
                }
            }
        }
        Err(_) => debug!("Yama LSM not present, ptrace scope unrestricted"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequirementError {
    #[error("/proc filesystem is not available")]
    ProcUnavailable,

    #[error("/proc is mounted but unreadable: {0}")]
    ProcUnreadable(String),
}
