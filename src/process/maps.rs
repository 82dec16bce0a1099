//! Parsing of /proc/<pid>/maps into memory regions and loaded libraries.
//!
//! The maps file is the source of truth for what address ranges a scan may
//! read and for which shared objects a process has loaded.

use std::fs;
use std::io;
use std::path::Path;

use ahash::AHashSet;

/// One mapped address range of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    pub readable: bool,
    /// Backing file, when the mapping is file-backed.
    pub path: Option<String>,
}

impl MemoryRegion {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Reads and parses /proc/<pid>/maps. Unparseable lines are dropped.
pub fn read_regions(proc_path: &Path) -> io::Result<Vec<MemoryRegion>> {
    let content = fs::read_to_string(proc_path.join("maps"))?;
    Ok(parse_maps(&content))
}

/// Parses the full maps text into regions, preserving file order
/// (ascending addresses).
pub fn parse_maps(content: &str) -> Vec<MemoryRegion> {
    content.lines().filter_map(parse_maps_line).collect()
}

/// Parses one maps line:
/// `55f0a000-55f0b000 r-xp 00000000 08:01 1234  /usr/bin/prog`
fn parse_maps_line(line: &str) -> Option<MemoryRegion> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let perms = fields.next()?;
    // offset, dev, inode
    fields.next()?;
    fields.next()?;
    fields.next()?;
    let path = fields.next().map(|first| {
        // Paths may contain spaces; rejoin the remainder.
        let rest: Vec<&str> = fields.collect();
        if rest.is_empty() {
            first.to_string()
        } else {
            let mut p = first.to_string();
            for part in rest {
                p.push(' ');
                p.push_str(part);
            }
            p
        }
    });

    let (start, end) = range.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;

    Some(MemoryRegion {
        start,
        end,
        readable: perms.starts_with('r'),
        path,
    })
}

/// Derives the loaded-library list from a process's regions: de-duplicated
/// basenames of file-backed mappings that look like shared objects.
pub fn loaded_libraries(regions: &[MemoryRegion]) -> Vec<String> {
    let mut seen = AHashSet::new();
    let mut libs: Vec<String> = Vec::new();
    for region in regions {
        let Some(path) = region.path.as_deref() else {
            continue;
        };
        let Some(base) = Path::new(path).file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !base.contains(".so") {
            continue;
        }
        if seen.insert(base) {
            libs.push(base.to_string());
        }
    }
    libs
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS_FIXTURE: &str = "\
55d84b849000-55d84b84b000 r--p 00000000 fd:01 3801383  /usr/bin/cat
55d84b84b000-55d84b850000 r-xp 00002000 fd:01 3801383  /usr/bin/cat
7f21a3a00000-7f21a3a28000 r--p 00000000 fd:01 3810001  /usr/lib/x86_64-linux-gnu/libc.so.6
7f21a3a28000-7f21a3bbd000 r-xp 00028000 fd:01 3810001  /usr/lib/x86_64-linux-gnu/libc.so.6
7f21a3c1e000-7f21a3c20000 rw-p 00000000 00:00 0
7f21a3c48000-7f21a3c4a000 r--p 00000000 fd:01 3809960  /usr/lib/x86_64-linux-gnu/ld-linux-x86-64.so.2
7ffc18b52000-7ffc18b73000 rw-p 00000000 00:00 0  [stack]
7ffc18bcd000-7ffc18bcf000 ---p 00000000 00:00 0  [vvar]
";

    #[test]
    fn test_parse_maps_fixture() {
        let regions = parse_maps(MAPS_FIXTURE);
        assert_eq!(regions.len(), 8);

        assert_eq!(regions[0].start, 0x55d84b849000);
        assert_eq!(regions[0].end, 0x55d84b84b000);
        assert!(regions[0].readable);
        assert_eq!(regions[0].path.as_deref(), Some("/usr/bin/cat"));

        // Anonymous rw mapping has no path.
        assert!(regions[4].path.is_none());
        assert!(regions[4].readable);

        // ---p region is not readable.
        assert!(!regions[7].readable);
        assert_eq!(regions[7].path.as_deref(), Some("[vvar]"));
    }

    #[test]
    fn test_parse_maps_drops_garbage_lines() {
        let regions = parse_maps("not a maps line\n55-zz r--p 0 0 0\n");
        assert!(regions.is_empty());
    }

    #[test]
    fn test_loaded_libraries_dedup() {
        let regions = parse_maps(MAPS_FIXTURE);
        let libs = loaded_libraries(&regions);
        assert_eq!(
            libs,
            vec!["libc.so.6".to_string(), "ld-linux-x86-64.so.2".to_string()]
        );
    }

    #[test]
    fn test_read_regions_self() {
        let regions = read_regions(std::path::Path::new("/proc/self")).unwrap();
        assert!(!regions.is_empty());
        assert!(regions.iter().any(|r| r.readable));
        // maps is sorted by the kernel; our parse must preserve that.
        for w in regions.windows(2) {
            assert!(w[0].start <= w[1].start);
        }
    }
}
