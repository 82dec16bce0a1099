//! Check command implementation.
//!
//! Validates that this host can actually be scanned: /proc availability,
//! process enumeration, self-probe of memory maps and memory, and the Yama
//! ptrace posture.

use std::path::Path;

use anyhow::{bail, Result};
use nix::unistd::geteuid;

use crate::config::{validate_effective_config, Config};
use crate::module::HOST;
use crate::process::{enumerate_processes, read_regions, ProcessMemory};

/// Validates host requirements and configuration.
pub fn command_check(config: &Config) -> Result<()> {
    println!("🔍 memscan - Host Check");
    println!("========================");
    println!("Host: {} (kernel {})", HOST.hostname, HOST.kernel);
    println!(
        "Build: {} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown build time")
    );

    let mut all_ok = true;

    println!("\n📁 Checking /proc filesystem...");
    if Path::new("/proc").is_dir() {
        println!("   ✅ /proc filesystem accessible");
        match enumerate_processes("/proc", Some(5)) {
            Ok(entries) if !entries.is_empty() => {
                println!("   ✅ Can enumerate processes ({} sampled)", entries.len());
            }
            Ok(_) => {
                println!("   ❌ No process entries readable from /proc");
                all_ok = false;
            }
            Err(e) => {
                println!("   ❌ Cannot list /proc: {e}");
                all_ok = false;
            }
        }
    } else {
        println!("   ❌ /proc filesystem not found");
        all_ok = false;
    }

    println!("\n💾 Checking self-probe...");
    let self_proc = Path::new("/proc").join(std::process::id().to_string());
    match read_regions(&self_proc) {
        Ok(regions) => {
            println!("   ✅ Own memory maps readable ({} regions)", regions.len());
        }
        Err(e) => {
            println!("   ❌ Cannot read own memory maps: {e}");
            all_ok = false;
        }
    }
    match ProcessMemory::open(&self_proc) {
        Ok(_) => println!("   ✅ Own memory readable"),
        Err(e) => {
            println!("   ❌ Cannot open own memory: {e}");
            all_ok = false;
        }
    }

    println!("\n🔐 Checking scan permissions...");
    if geteuid().is_root() {
        println!("   ✅ Running as root");
    } else {
        println!("   ⚠️  Not running as root - other users' processes will fail per-process");
    }
    match std::fs::read_to_string("/proc/sys/kernel/yama/ptrace_scope") {
        Ok(v) => {
            let scope = v.trim().to_string();
            if scope == "0" || scope == "1" {
                println!("   ✅ yama ptrace_scope={scope}");
            } else {
                println!("   ⚠️  yama ptrace_scope={scope} - cross-process memory reads blocked");
            }
        }
        Err(_) => println!("   ✅ Yama LSM not present"),
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {e}");
            all_ok = false;
        }
    }

    if all_ok {
        println!("\n✅ Host check passed");
        Ok(())
    } else {
        bail!("host check failed");
    }
}
