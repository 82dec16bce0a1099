//! Search request model and validation.
//!
//! This module defines the wire schema for scan requests (a named map of
//! searches, each carrying criteria lists and options) and validates a
//! request before any process is touched. All fields are optional on the
//! wire; defaults are applied during deserialization so validation always
//! sees a fully-shaped request.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::bytes::RegexBuilder as BytesRegexBuilder;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Longest accepted search name, in characters.
pub const MAX_SEARCH_NAME_LEN: usize = 64;

/// Accepted search-name alphabet. Names identify searches in results and in
/// rendered report lines, so they stay within a shell- and log-safe set.
static SEARCH_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("search name pattern is a valid regex"));

/// A full scan request: search name -> search definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Searches are kept in a sorted map so result iteration order is
    /// deterministic across runs.
    #[serde(default)]
    pub searches: BTreeMap<String, Search>,
}

/// One named set of matching criteria plus options.
///
/// Empty criteria lists are legal: an empty category contributes no matches
/// and is excluded from the `matchall` requirement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Search {
    /// Literal substrings matched case-sensitively against the process name
    /// and executable path.
    #[serde(default)]
    pub names: Vec<String>,

    /// Regular expressions matched against the names of libraries loaded
    /// into a process. A pattern must match a library name over its full
    /// span.
    #[serde(default)]
    pub libraries: Vec<String>,

    /// Hex-encoded byte sequences searched for in process memory.
    #[serde(default)]
    pub bytes: Vec<String>,

    /// Regular expressions applied to process memory as raw bytes.
    #[serde(default)]
    pub contents: Vec<String>,

    /// Free-form annotation. Not interpreted by the engine.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub options: SearchOptions,
}

/// Per-search options.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Require every populated criteria category, and every pattern within
    /// each category, to match before a process counts as a hit.
    #[serde(default)]
    pub matchall: bool,

    /// Bytes to skip at the start of each process's scanned memory.
    #[serde(default)]
    pub offset: i64,

    /// Maximum number of bytes scanned per process. 0 scans to the end of
    /// mapped readable memory (subject to the engine's configured cap).
    #[serde(default)]
    pub maxlength: i64,

    /// Record per-process access failures in the result instead of silently
    /// skipping them.
    #[serde(default)]
    pub logfailures: bool,
}

/// Why a request was rejected. The first violation encountered is returned;
/// nothing is scanned for a request with any invalid search.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid search name '{name}': names are 1-{max} characters of [A-Za-z0-9._-]", max = MAX_SEARCH_NAME_LEN)]
    InvalidSearchName { name: String },

    #[error("search '{search}': library pattern '{pattern}' does not compile: {source}")]
    BadLibraryPattern {
        search: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("search '{search}': content pattern '{pattern}' does not compile: {source}")]
    BadContentPattern {
        search: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("search '{search}': byte pattern '{pattern}' is not non-empty even-length hex")]
    BadBytePattern { search: String, pattern: String },

    #[error("search '{search}': option '{option}' must not be negative (got {value})")]
    NegativeOption {
        search: String,
        option: &'static str,
        value: i64,
    },
}

impl SearchRequest {
    /// Validates the whole request, failing fast on the first violation.
    ///
    /// Check order: search names, then regex compilation for
    /// `libraries`/`contents`, then hex decoding for `bytes`, then numeric
    /// options.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for name in self.searches.keys() {
            if !is_valid_search_name(name) {
                return Err(ValidationError::InvalidSearchName { name: name.clone() });
            }
        }

        for (name, search) in &self.searches {
            for pattern in &search.libraries {
                if let Err(source) = Regex::new(pattern) {
                    return Err(ValidationError::BadLibraryPattern {
                        search: name.clone(),
                        pattern: pattern.clone(),
                        source,
                    });
                }
            }
            for pattern in &search.contents {
                if let Err(source) = compile_content_pattern(pattern) {
                    return Err(ValidationError::BadContentPattern {
                        search: name.clone(),
                        pattern: pattern.clone(),
                        source,
                    });
                }
            }
        }

        for (name, search) in &self.searches {
            for pattern in &search.bytes {
                if pattern.is_empty() || hex::decode(pattern).is_err() {
                    return Err(ValidationError::BadBytePattern {
                        search: name.clone(),
                        pattern: pattern.clone(),
                    });
                }
            }
        }

        for (name, search) in &self.searches {
            if search.options.offset < 0 {
                return Err(ValidationError::NegativeOption {
                    search: name.clone(),
                    option: "offset",
                    value: search.options.offset,
                });
            }
            if search.options.maxlength < 0 {
                return Err(ValidationError::NegativeOption {
                    search: name.clone(),
                    option: "maxlength",
                    value: search.options.maxlength,
                });
            }
        }

        Ok(())
    }
}

/// Search-name rule: non-empty, at most [`MAX_SEARCH_NAME_LEN`] characters,
/// alphanumerics plus `._-`.
pub fn is_valid_search_name(name: &str) -> bool {
    !name.is_empty() && name.chars().count() <= MAX_SEARCH_NAME_LEN && SEARCH_NAME_RE.is_match(name)
}

/// Compiles a `contents` pattern the way the engine will run it: against raw
/// bytes, with Unicode mode off so `.` and classes match arbitrary bytes
/// rather than well-formed UTF-8 only.
pub fn compile_content_pattern(pattern: &str) -> Result<regex::bytes::Regex, regex::Error> {
    BytesRegexBuilder::new(pattern).unicode(false).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(name: &str, search: Search) -> SearchRequest {
        let mut req = SearchRequest::default();
        req.searches.insert(name.to_string(), search);
        req
    }

    // -------------------------------------------------------------------------
    // Search-name rule
    // -------------------------------------------------------------------------

    #[test]
    fn test_search_name_rule() {
        assert!(is_valid_search_name("s1"));
        assert!(is_valid_search_name("find-beacon_v2.1"));
        assert!(is_valid_search_name(&"a".repeat(MAX_SEARCH_NAME_LEN)));

        assert!(!is_valid_search_name(""));
        assert!(!is_valid_search_name("*&^!*@&#^*!"));
        assert!(!is_valid_search_name("white space"));
        assert!(!is_valid_search_name(&"a".repeat(MAX_SEARCH_NAME_LEN + 1)));
        assert!(!is_valid_search_name(&"a".repeat(96)));
    }

    #[test]
    fn test_validate_rejects_bad_name() {
        let req = request_with("", Search::default());
        assert!(matches!(
            req.validate(),
            Err(ValidationError::InvalidSearchName { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Regex compilation
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_library_patterns() {
        let ok = request_with(
            "s1",
            Search {
                libraries: vec!["^[a-z]{10,50}$".into()],
                ..Default::default()
            },
        );
        assert!(ok.validate().is_ok());

        let bad = request_with(
            "s1",
            Search {
                libraries: vec!["[".into()],
                ..Default::default()
            },
        );
        assert!(matches!(
            bad.validate(),
            Err(ValidationError::BadLibraryPattern { .. })
        ));
    }

    #[test]
    fn test_validate_content_patterns() {
        let bad = request_with(
            "s1",
            Search {
                contents: vec!["^$".into(), "[".into()],
                ..Default::default()
            },
        );
        let err = bad.validate().unwrap_err();
        match err {
            ValidationError::BadContentPattern { pattern, .. } => assert_eq!(pattern, "["),
            other => panic!("unexpected error: {other}"),
        }
    }

    // -------------------------------------------------------------------------
    // Byte patterns
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_byte_patterns() {
        let ok = request_with(
            "s1",
            Search {
                bytes: vec!["abcd".into(), "00ff".into(), "DEADBEEF".into()],
                ..Default::default()
            },
        );
        assert!(ok.validate().is_ok());

        for bad_pattern in ["abc", "ghij", "", "0xff"] {
            let bad = request_with(
                "s1",
                Search {
                    bytes: vec![bad_pattern.into()],
                    ..Default::default()
                },
            );
            assert!(
                matches!(bad.validate(), Err(ValidationError::BadBytePattern { .. })),
                "'{bad_pattern}' should be rejected"
            );
        }
    }

    // -------------------------------------------------------------------------
    // Options
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_negative_options() {
        let mut search = Search::default();
        search.options.offset = -1;
        let req = request_with("s1", search);
        assert!(matches!(
            req.validate(),
            Err(ValidationError::NegativeOption { option: "offset", .. })
        ));

        let mut search = Search::default();
        search.options.maxlength = -20;
        let req = request_with("s1", search);
        assert!(matches!(
            req.validate(),
            Err(ValidationError::NegativeOption {
                option: "maxlength",
                ..
            })
        ));
    }

    // -------------------------------------------------------------------------
    // Wire shape
    // -------------------------------------------------------------------------

    #[test]
    fn test_defaults_applied_before_validation() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"searches":{"s1":{"names":["foo"]}}}"#).unwrap();
        let s = &req.searches["s1"];
        assert!(s.libraries.is_empty());
        assert!(s.bytes.is_empty());
        assert!(!s.options.matchall);
        assert_eq!(s.options.offset, 0);
        assert_eq!(s.options.maxlength, 0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_name_literals_are_not_regexes() {
        // '[' is an invalid regex but a perfectly good substring literal.
        let req = request_with(
            "s1",
            Search {
                names: vec!["[".into()],
                ..Default::default()
            },
        );
        assert!(req.validate().is_ok());
    }
}
