//! Raw byte-sequence matching over scanned memory.
//!
//! Fed one memory chunk at a time; records the address where each pattern
//! is first seen and stops looking for that pattern. Because chunks within
//! a region overlap by at least the longest pattern minus one byte, a
//! pattern inside one region is always seen whole; a pattern spanning two
//! separate regions is not found (scanning-granularity limitation).

use memchr::memmem;

use crate::matchers::Hit;
use crate::process::Chunk;

/// Stateful byte matcher for one (search, process) probe.
pub struct ByteMatcher<'p> {
    patterns: &'p [Vec<u8>],
    finders: Vec<memmem::Finder<'p>>,
    found: Vec<Option<u64>>,
}

impl<'p> ByteMatcher<'p> {
    pub fn new(patterns: &'p [Vec<u8>]) -> Self {
        Self {
            patterns,
            finders: patterns.iter().map(|p| memmem::Finder::new(p)).collect(),
            found: vec![None; patterns.len()],
        }
    }

    /// Longest pattern in bytes; drives the chunk overlap.
    pub fn max_pattern_len(&self) -> usize {
        self.patterns.iter().map(|p| p.len()).max().unwrap_or(0)
    }

    /// True once every pattern has been located.
    pub fn complete(&self) -> bool {
        self.found.iter().all(|f| f.is_some())
    }

    /// Searches one chunk for every still-missing pattern.
    pub fn feed(&mut self, chunk: &Chunk<'_>) {
        for (i, finder) in self.finders.iter().enumerate() {
            if self.found[i].is_some() {
                continue;
            }
            if let Some(pos) = finder.find(chunk.data) {
                self.found[i] = Some(chunk.base + pos as u64);
            }
        }
    }

    /// Consumes the matcher into hits, in pattern order.
    pub fn hits(self) -> Vec<Hit> {
        self.found
            .into_iter()
            .enumerate()
            .filter_map(|(pattern, offset)| {
                offset.map(|offset| Hit {
                    pattern,
                    offset: Some(offset),
                    matched: None,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(base: u64, data: &[u8]) -> Chunk<'_> {
        Chunk { base, data }
    }

    #[test]
    fn test_finds_pattern_with_address() {
        let patterns = vec![b"needle".to_vec()];
        let mut m = ByteMatcher::new(&patterns);
        m.feed(&chunk(0x1000, b"haystack needle haystack"));
        assert!(m.complete());
        let hits = m.hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offset, Some(0x1000 + 9));
    }

    #[test]
    fn test_first_occurrence_wins() {
        let patterns = vec![b"ab".to_vec()];
        let mut m = ByteMatcher::new(&patterns);
        m.feed(&chunk(0x0, b"..ab..ab"));
        m.feed(&chunk(0x100, b"ab"));
        let hits = m.hits();
        assert_eq!(hits[0].offset, Some(2));
    }

    #[test]
    fn test_pattern_across_chunk_overlap() {
        // Two chunks of one region, overlapping by 4 bytes; the pattern
        // straddles the seam and is visible in the second chunk's data.
        let patterns = vec![b"SEAM".to_vec()];
        let mut m = ByteMatcher::new(&patterns);
        let region: &[u8] = b"xxxxxxSEAMyyyyyy";
        m.feed(&chunk(0x0, &region[..8])); // "xxxxxxSE"
        m.feed(&chunk(0x4, &region[4..])); // "xxSEAMyyyyyy"
        assert!(m.complete());
        assert_eq!(m.hits()[0].offset, Some(6));
    }

    #[test]
    fn test_pattern_across_region_boundary_not_found() {
        // Separate regions are fed as unrelated chunks; a pattern split
        // between them never matches. This documents the scanning
        // granularity rather than fixing it.
        let patterns = vec![b"SPLIT".to_vec()];
        let mut m = ByteMatcher::new(&patterns);
        m.feed(&chunk(0x1000, b"......SPL"));
        m.feed(&chunk(0x2000, b"IT......."));
        assert!(!m.complete());
        assert!(m.hits().is_empty());
    }

    #[test]
    fn test_multiple_patterns_tracked_independently() {
        let patterns = vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()];
        let mut m = ByteMatcher::new(&patterns);
        assert_eq!(m.max_pattern_len(), 5);
        m.feed(&chunk(0x0, b"two one"));
        assert!(!m.complete());
        let hits = m.hits();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].pattern, 0);
        assert_eq!(hits[0].offset, Some(4));
        assert_eq!(hits[1].pattern, 1);
        assert_eq!(hits[1].offset, Some(0));
    }
}
