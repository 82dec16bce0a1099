//! Loaded-library matching: full-span regular expressions over library names.

use regex::Regex;

use crate::matchers::Hit;

/// Tests each pattern against each library name; a pattern hits on the
/// first library it matches over the name's full span. A single library
/// satisfying a pattern is enough for that pattern.
pub fn match_libraries(libraries: &[String], patterns: &[Regex]) -> Vec<Hit> {
    let mut hits = Vec::new();
    for (i, pattern) in patterns.iter().enumerate() {
        if let Some(lib) = libraries.iter().find(|lib| full_match(pattern, lib)) {
            hits.push(Hit {
                pattern: i,
                offset: None,
                matched: Some(lib.clone()),
            });
        }
    }
    hits
}

/// A match counts only when it spans the entire library name.
fn full_match(pattern: &Regex, name: &str) -> bool {
    pattern
        .find(name)
        .is_some_and(|m| m.start() == 0 && m.end() == name.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(patterns: &[&str]) -> Vec<Regex> {
        patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
    }

    #[test]
    fn test_full_span_required() {
        let libs = vec!["libc.so.6".to_string(), "libssl.so.3".to_string()];

        // Partial pattern does not count.
        assert!(match_libraries(&libs, &compile(&["libc"])).is_empty());
        // Full-span pattern does.
        let hits = match_libraries(&libs, &compile(&[r"libc\.so\.\d"]));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].matched.as_deref(), Some("libc.so.6"));
    }

    #[test]
    fn test_anchored_patterns_behave_identically() {
        let libs = vec!["libssl.so.3".to_string()];
        let hits = match_libraries(&libs, &compile(&[r"^libssl\.so\.3$"]));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_one_library_per_pattern() {
        let libs = vec!["liba.so".to_string(), "libb.so".to_string()];
        // The wildcard matches both libraries but yields a single hit,
        // recording the first matching library.
        let hits = match_libraries(&libs, &compile(&[r"lib.\.so"]));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].matched.as_deref(), Some("liba.so"));
    }

    #[test]
    fn test_absent_library_no_hit() {
        let libs = vec!["libc.so.6".to_string()];
        assert!(match_libraries(&libs, &compile(&["^caribou.so$"])).is_empty());
    }
}
