//! Bounded, chunked reads of live process memory via /proc/<pid>/mem.
//!
//! A [`ProcessMemory`] handle is opened once per process probe and dropped
//! when the probe ends, on success and failure alike. Scanning walks the
//! readable regions in address order through a fixed-size buffer; a region
//! that cannot be read is skipped rather than failing the probe.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::time::Instant;

use once_cell::sync::Lazy;

use crate::process::maps::MemoryRegion;

/// System page size, read once. Chunk reads are aligned to it so a fault in
/// one page does not discard a whole oversized read.
pub static PAGE_SIZE: Lazy<u64> =
    Lazy::new(|| match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        n if n > 0 => n as u64,
        _ => 4096,
    });

/// Open handle to one process's memory.
pub struct ProcessMemory {
    file: File,
}

impl ProcessMemory {
    /// Opens /proc/<pid>/mem for reading. Fails when the process has exited
    /// or the caller lacks ptrace-read permission for it.
    pub fn open(proc_path: &Path) -> io::Result<Self> {
        let file = File::open(proc_path.join("mem"))?;
        Ok(Self { file })
    }

    /// Reads up to `buf.len()` bytes at `addr`. Short reads happen at region
    /// edges; an error means the range is not readable at all.
    pub fn read_at(&self, buf: &mut [u8], addr: u64) -> io::Result<usize> {
        self.file.read_at(buf, addr)
    }
}

/// Linear scan window over a process's readable memory: skip `offset` bytes,
/// then visit at most `limit` bytes (0 = to the end of mapped memory).
#[derive(Debug, Clone, Copy)]
pub struct ScanWindow {
    pub offset: u64,
    pub limit: u64,
}

/// One buffer-load of memory handed to a visitor.
///
/// Consecutive chunks of a region overlap by the scan's overlap length, so
/// a match that straddles a chunk seam inside a region is still visible in
/// full in the later chunk.
pub struct Chunk<'a> {
    /// Virtual address of `data[0]` in the scanned process.
    pub base: u64,
    pub data: &'a [u8],
}

/// The scan was cut off before visiting the whole window.
#[derive(Debug, thiserror::Error)]
pub enum ScanInterrupt {
    #[error("process scan exceeded its time budget")]
    Timeout,
}

/// Walks the readable regions through `visit`, reading `chunk_size`-byte
/// chunks with `overlap` extra bytes past each chunk.
///
/// Matches spanning two distinct regions cannot be observed: each region is
/// scanned independently, a deliberate scanning-granularity limitation.
/// The visitor returns `false` to stop early (e.g. all patterns found).
/// Returns the number of fresh bytes visited.
pub fn scan_regions<F>(
    mem: &ProcessMemory,
    regions: &[MemoryRegion],
    window: ScanWindow,
    chunk_size: usize,
    overlap: usize,
    deadline: Option<Instant>,
    mut visit: F,
) -> Result<u64, ScanInterrupt>
where
    F: FnMut(&Chunk<'_>) -> bool,
{
    let chunk_size = chunk_size.max(*PAGE_SIZE as usize);
    let mut buf = vec![0u8; chunk_size + overlap];

    let mut to_skip = window.offset;
    let mut scanned: u64 = 0;

    for region in regions.iter().filter(|r| r.readable && !r.is_empty()) {
        let region_len = region.len();
        if to_skip >= region_len {
            to_skip -= region_len;
            continue;
        }
        let mut pos = region.start + to_skip;
        to_skip = 0;

        while pos < region.end {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(ScanInterrupt::Timeout);
                }
            }
            if window.limit > 0 && scanned >= window.limit {
                return Ok(scanned);
            }

            let mut fresh = chunk_size.min((region.end - pos) as usize);
            if window.limit > 0 {
                fresh = fresh.min((window.limit - scanned) as usize);
            }
            let want = (fresh + overlap).min((region.end - pos) as usize);

            match mem.read_at(&mut buf[..want], pos) {
                Ok(0) | Err(_) => {
                    // Unreadable despite the maps entry (locked, swapped-out
                    // guard page, raced unmap). Skip the rest of the region.
                    break;
                }
                Ok(n) => {
                    let fresh_len = fresh.min(n);
                    scanned += fresh_len as u64;
                    let chunk = Chunk {
                        base: pos,
                        data: &buf[..n],
                    };
                    if !visit(&chunk) {
                        return Ok(scanned);
                    }
                    pos += fresh_len as u64;
                }
            }
        }
    }

    Ok(scanned)
}
