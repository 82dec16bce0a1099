//! Process discovery: walking /proc for candidate processes.
//!
//! Each scan run re-enumerates from scratch so no stale pid is ever probed.
//! A single unreadable /proc entry is skipped, never propagated as fatal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Identity of one running process, captured transiently for a single run.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub pid: u32,
    /// Short process name from /proc/<pid>/comm (or cmdline fallback).
    pub name: String,
    /// Executable path from the /proc/<pid>/exe symlink (or cmdline fallback).
    /// Empty when the link is unreadable (kernel threads, permission).
    pub path: String,
    /// The process's /proc directory, reused for maps and memory access.
    pub proc_path: PathBuf,
}

/// Enumerates running processes under `root` (normally "/proc").
///
/// Fails only when the directory itself cannot be listed; per-entry read
/// errors drop that entry. `max` caps how many records are returned.
pub fn enumerate_processes(root: &str, max: Option<usize>) -> io::Result<Vec<ProcessRecord>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let p = entry.path();
        let dirname = match p.file_name().and_then(|s| s.to_str()) {
            Some(v) => v,
            None => continue,
        };
        if !dirname.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let pid: u32 = match dirname.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        // A process can exit between readdir and here; treat a nameless
        // entry as already gone.
        let name = match read_process_name(&p) {
            Some(n) => n,
            None => continue,
        };
        let path = read_exe_path(&p).unwrap_or_default();
        out.push(ProcessRecord {
            pid,
            name,
            path,
            proc_path: p,
        });
        if let Some(maxp) = max {
            if out.len() >= maxp {
                break;
            }
        }
    }
    Ok(out)
}

/// Reads the short process name from comm, falling back to cmdline argv[0].
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    let comm = proc_path.join("comm");
    if let Ok(s) = fs::read_to_string(&comm) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    let cmd = proc_path.join("cmdline");
    if let Ok(content) = fs::read(&cmd) {
        if !content.is_empty() {
            let parts: Vec<&str> = content
                .split(|&b| b == 0u8)
                .filter_map(|s| std::str::from_utf8(s).ok())
                .collect();
            if !parts.is_empty() {
                if let Some(name) = Path::new(parts[0]).file_name() {
                    return name.to_str().map(|s| s.to_string());
                }
            }
        }
    }
    None
}

/// Resolves the executable path, preferring the exe symlink over cmdline.
fn read_exe_path(proc_path: &Path) -> Option<String> {
    if let Ok(target) = fs::read_link(proc_path.join("exe")) {
        return Some(target.to_string_lossy().into_owned());
    }

    let cmd = proc_path.join("cmdline");
    if let Ok(content) = fs::read(&cmd) {
        if let Some(argv0) = content.split(|&b| b == 0u8).next() {
            if !argv0.is_empty() {
                return std::str::from_utf8(argv0).ok().map(|s| s.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_includes_self() {
        let own_pid = std::process::id();
        let procs = enumerate_processes("/proc", None).expect("/proc should be listable");
        assert!(!procs.is_empty());
        let me = procs
            .iter()
            .find(|p| p.pid == own_pid)
            .expect("own process should be enumerated");
        assert!(!me.name.is_empty());
        assert_eq!(me.proc_path, Path::new("/proc").join(own_pid.to_string()));
    }

    #[test]
    fn test_enumerate_respects_max() {
        let procs = enumerate_processes("/proc", Some(3)).unwrap();
        assert!(procs.len() <= 3);
    }

    #[test]
    fn test_enumerate_missing_root_fails() {
        assert!(enumerate_processes("/nonexistent-proc-root", None).is_err());
    }

    #[test]
    fn test_read_process_name_self() {
        let p = Path::new("/proc/self");
        let name = read_process_name(p).expect("own comm should be readable");
        assert!(!name.is_empty());
    }
}
