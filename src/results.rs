//! Result model and report rendering.
//!
//! A run produces one [`Results`] document: per-search match elements and
//! failures, run statistics, and fatal errors. [`render`] turns a document
//! into self-describing report lines for the CLI/reporting layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which criteria category produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Name,
    Library,
    Bytes,
    Content,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Name => "name",
            Category::Library => "library",
            Category::Bytes => "byte pattern",
            Category::Content => "content pattern",
        };
        f.write_str(s)
    }
}

/// One concrete hit, carrying enough context to be rendered on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchElement {
    pub search: String,
    pub category: Category,
    /// The literal or pattern, as supplied in the request.
    pub pattern: String,
    pub pid: u32,
    /// Short process name.
    pub process: String,
    /// Executable path, empty when unresolvable.
    pub path: String,
    /// Virtual address where the match begins, for byte/content matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// What actually matched: the library name for library matches, the
    /// (lossily decoded, truncated) matched text for content matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

/// Outcome of one named search across all processes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub foundanything: bool,
    pub matches: Vec<MatchElement>,
    /// Per-process probe failures, populated only when the search set
    /// `logfailures`.
    pub failures: Vec<String>,
}

/// Run-wide counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub processes_scanned: usize,
    pub processes_failed: usize,
    pub totalhits: usize,
    /// Wall-clock duration of the run, e.g. "142.7ms".
    pub exectime: String,
    /// RFC 3339 timestamp of when the scan started.
    pub scanned_at: String,
}

/// Top-level result document returned to the caller.
///
/// `success=false` means the run itself broke and the rest of the document
/// is not trustworthy; it is distinct from `foundanything=false`, which
/// means the run completed and found nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Results {
    pub success: bool,
    pub foundanything: bool,
    pub searches: BTreeMap<String, SearchResult>,
    pub statistics: Statistics,
    pub errors: Vec<String>,
}

impl Results {
    /// A well-formed document for a run that could not execute at all.
    pub fn fatal(error: impl Into<String>) -> Self {
        Results {
            success: false,
            errors: vec![error.into()],
            statistics: Statistics {
                scanned_at: chrono::Utc::now().to_rfc3339(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Renders a result document as display lines.
///
/// With `only_found=false`, one line per match element, per logged failure,
/// and per fatal error; an empty vector when the run found nothing and
/// logged nothing. With `only_found=true`, a single terse summary line when
/// anything was found, otherwise no lines.
pub fn render(results: &Results, only_found: bool) -> Vec<String> {
    if only_found {
        return if results.foundanything {
            vec!["at least one memory search matched".to_string()]
        } else {
            Vec::new()
        };
    }

    let mut lines = Vec::new();
    for (name, sr) in &results.searches {
        for m in &sr.matches {
            lines.push(render_match(m));
        }
        for f in &sr.failures {
            lines.push(format!("search '{name}' failure: {f}"));
        }
    }
    for e in &results.errors {
        lines.push(format!("error: {e}"));
    }
    lines
}

fn render_match(m: &MatchElement) -> String {
    let mut line = format!(
        "search '{}' matched {} '{}' in process '{}' [pid {}]",
        m.search, m.category, m.pattern, m.process, m.pid
    );
    if let Some(offset) = m.offset {
        line.push_str(&format!(" at 0x{offset:x}"));
    }
    if let Some(matched) = &m.matched {
        line.push_str(&format!(" ({matched})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(search: &str, category: Category) -> MatchElement {
        MatchElement {
            search: search.into(),
            category,
            pattern: "pat".into(),
            pid: 42,
            process: "proc".into(),
            path: "/usr/bin/proc".into(),
            offset: None,
            matched: None,
        }
    }

    #[test]
    fn test_render_only_found_single_line() {
        let mut results = Results {
            success: true,
            foundanything: true,
            ..Default::default()
        };
        results
            .searches
            .insert("s1".into(), SearchResult::default());
        assert_eq!(render(&results, true).len(), 1);

        results.foundanything = false;
        assert!(render(&results, true).is_empty());
    }

    #[test]
    fn test_render_full_lines() {
        let mut results = Results {
            success: true,
            foundanything: true,
            ..Default::default()
        };
        let mut sr = SearchResult {
            foundanything: true,
            ..Default::default()
        };
        sr.matches.push(element("s1", Category::Name));
        let mut byte_hit = element("s1", Category::Bytes);
        byte_hit.offset = Some(0x7f00_1000);
        sr.matches.push(byte_hit);
        sr.failures
            .push("pid 99 (ghost): permission denied".to_string());
        results.searches.insert("s1".into(), sr);

        let lines = render(&results, false);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("matched name 'pat' in process 'proc' [pid 42]"));
        assert!(lines[1].contains("at 0x7f001000"));
        assert!(lines[2].starts_with("search 's1' failure: pid 99"));
    }

    #[test]
    fn test_render_empty_when_nothing_found() {
        let mut results = Results {
            success: true,
            ..Default::default()
        };
        results
            .searches
            .insert("quiet".into(), SearchResult::default());
        assert!(render(&results, false).is_empty());
    }

    #[test]
    fn test_render_fatal_errors() {
        let results = Results::fatal("cannot enumerate processes");
        let lines = render(&results, false);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("error: "));
        // only_found mode stays silent: nothing was found.
        assert!(render(&results, true).is_empty());
    }

    #[test]
    fn test_results_roundtrip_json() {
        let mut results = Results {
            success: true,
            foundanything: true,
            ..Default::default()
        };
        let mut sr = SearchResult {
            foundanything: true,
            ..Default::default()
        };
        sr.matches.push(element("s1", Category::Content));
        results.searches.insert("s1".into(), sr);

        let raw = serde_json::to_string(&results).unwrap();
        let back: Results = serde_json::from_str(&raw).unwrap();
        assert!(back.success && back.foundanything);
        assert_eq!(back.searches["s1"].matches.len(), 1);
        assert_eq!(back.searches["s1"].matches[0].category, Category::Content);
    }
}
