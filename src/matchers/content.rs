//! Content matching: regular expressions over memory interpreted as bytes.
//!
//! Shares the byte matcher's chunked scanning window and limitations. A
//! content match longer than the configured chunk overlap can be missed
//! when it straddles a chunk seam; matches never span two separate regions.

use regex::bytes::Regex;

use crate::matchers::Hit;
use crate::process::Chunk;

/// Longest matched text carried into a result, in characters. Memory is
/// arbitrary bytes; anything longer only bloats the report.
const MATCHED_TEXT_MAX: usize = 120;

/// Stateful content matcher for one (search, process) probe.
pub struct ContentMatcher<'p> {
    patterns: &'p [Regex],
    found: Vec<Option<(u64, String)>>,
}

impl<'p> ContentMatcher<'p> {
    pub fn new(patterns: &'p [Regex]) -> Self {
        Self {
            patterns,
            found: vec![None; patterns.len()],
        }
    }

    pub fn complete(&self) -> bool {
        self.found.iter().all(|f| f.is_some())
    }

    /// Applies every still-missing pattern to one chunk.
    pub fn feed(&mut self, chunk: &Chunk<'_>) {
        for (i, pattern) in self.patterns.iter().enumerate() {
            if self.found[i].is_some() {
                continue;
            }
            if let Some(m) = pattern.find(chunk.data) {
                let text = display_text(m.as_bytes());
                self.found[i] = Some((chunk.base + m.start() as u64, text));
            }
        }
    }

    /// Consumes the matcher into hits, in pattern order.
    pub fn hits(self) -> Vec<Hit> {
        self.found
            .into_iter()
            .enumerate()
            .filter_map(|(pattern, found)| {
                found.map(|(offset, matched)| Hit {
                    pattern,
                    offset: Some(offset),
                    matched: Some(matched),
                })
            })
            .collect()
    }
}

/// Lossily decodes matched bytes for display, bounded in length.
fn display_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.chars().count() <= MATCHED_TEXT_MAX {
        text.into_owned()
    } else {
        let mut truncated: String = text.chars().take(MATCHED_TEXT_MAX).collect();
        truncated.push('…');
        truncated
    }
}
