//! Process introspection: discovery, memory maps, and memory access.
//!
//! This module provides:
//! - `scanner`: process discovery from /proc
//! - `maps`: /proc/<pid>/maps parsing and loaded-library derivation
//! - `memory`: bounded chunked reads of /proc/<pid>/mem

pub mod maps;
pub mod memory;
pub mod scanner;

// Re-export commonly used types
pub use maps::{loaded_libraries, parse_maps, read_regions, MemoryRegion};
pub use memory::{scan_regions, Chunk, ProcessMemory, ScanInterrupt, ScanWindow, PAGE_SIZE};
pub use scanner::{enumerate_processes, read_process_name, ProcessRecord};
