//! Process-name matching: case-sensitive literal substrings.

use crate::matchers::Hit;
use crate::process::ProcessRecord;

/// Tests each literal independently against the process's short name and
/// executable path. One hit per matching literal.
pub fn match_names(record: &ProcessRecord, literals: &[String]) -> Vec<Hit> {
    let mut hits = Vec::new();
    for (i, literal) in literals.iter().enumerate() {
        if record.name.contains(literal.as_str()) || record.path.contains(literal.as_str()) {
            hits.push(Hit {
                pattern: i,
                offset: None,
                matched: None,
            });
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(name: &str, path: &str) -> ProcessRecord {
        ProcessRecord {
            pid: 1,
            name: name.into(),
            path: path.into(),
            proc_path: PathBuf::from("/proc/1"),
        }
    }

    #[test]
    fn test_substring_against_name_and_path() {
        let rec = record("nginx", "/usr/sbin/nginx");
        assert_eq!(match_names(&rec, &["ngin".into()]).len(), 1);
        assert_eq!(match_names(&rec, &["/usr/sbin".into()]).len(), 1);
        assert!(match_names(&rec, &["apache".into()]).is_empty());
    }

    #[test]
    fn test_case_sensitive() {
        let rec = record("nginx", "/usr/sbin/nginx");
        assert!(match_names(&rec, &["NGINX".into()]).is_empty());
    }

    #[test]
    fn test_literals_independent() {
        let rec = record("sshd", "/usr/sbin/sshd");
        let hits = match_names(&rec, &["ssh".into(), "zzz".into(), "sbin".into()]);
        let matched: Vec<usize> = hits.iter().map(|h| h.pattern).collect();
        assert_eq!(matched, vec![0, 2]);
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let rec = record("weird[1]", "/opt/weird[1]");
        assert_eq!(match_names(&rec, &["[1]".into()]).len(), 1);
        assert!(match_names(&rec, &[".*".into()]).is_empty());
    }
}
