//! TOML fixture files.
//!
//! A fixture file holds one or more `[[case]]` tables:
//!
//! ```toml
//! [[case]]
//! name = "link-target"
//! input = '<a href="{{{1}}}">x</a>'
//! args = [["1", "/wiki/Main"]]
//! expected = '<a href="/wiki/Main">x</a>'
//! ```
//!
//! Set `HTML_FIXTURE_FILTER` to a substring to run only matching cases.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{diff_lines, escape_text};

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixtureStatus {
    #[default]
    Active,
    /// Known divergence; the case must keep failing until the fixture is updated.
    Xfail,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureCase {
    pub name: String,
    pub input: String,
    pub expected: String,
    /// Ordered `[name, value]` pairs.
    #[serde(default)]
    pub args: Vec<(String, String)>,
    /// Expected script module dependencies, in order.
    #[serde(default)]
    pub scripts: Vec<String>,
    /// Expected style module dependencies, in order.
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub status: FixtureStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixtureFile {
    #[serde(rename = "case", default)]
    cases: Vec<FixtureCase>,
}

/// Parse every case of one fixture file. Panics with the file path on malformed input.
pub fn load_cases(path: &Path) -> Vec<FixtureCase> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read fixture file {path:?}: {err}"));
    let file: FixtureFile = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse fixture file {path:?}: {err}"));
    for case in &file.cases {
        if case.status == FixtureStatus::Xfail {
            assert!(
                case.reason.is_some(),
                "xfail case '{}' in {path:?} needs a reason",
                case.name
            );
        }
    }
    file.cases
}

/// Every `*.toml` file under `dir`, sorted by file name.
pub fn fixture_files(dir: &Path) -> Vec<PathBuf> {
    let entries = fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("failed to read fixture dir {dir:?}: {err}"));
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();
    files
}

#[derive(Debug, Default)]
pub struct FixtureFilter {
    needle: Option<String>,
}

impl FixtureFilter {
    pub fn from_env() -> Self {
        Self {
            needle: std::env::var("HTML_FIXTURE_FILTER")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.needle.as_deref().is_none_or(|needle| name.contains(needle))
    }
}

/// Human-readable report for a case whose output differs from the expectation.
pub fn describe_mismatch(case: &FixtureCase, actual: &str) -> String {
    let expected: Vec<&str> = case.expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    format!(
        "fixture '{}' mismatch\ninput: \"{}\"\nexpected: \"{}\"\nactual: \"{}\"\n{}",
        case.name,
        escape_text(&case.input),
        escape_text(&case.expected),
        escape_text(actual),
        diff_lines(&expected, &actual_lines)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cases_parse_with_defaults() {
        let file: FixtureFile = toml::from_str(
            r#"
            [[case]]
            name = "plain"
            input = "<p>x</p>"
            expected = "<p>x</p>"

            [[case]]
            name = "args"
            input = "{{{1}}}"
            expected = "a"
            args = [["1", "a"]]
            scripts = ["m"]
            status = "xfail"
            reason = "pending"
            "#,
        )
        .expect("fixture parses");
        assert_eq!(file.cases.len(), 2);
        assert_eq!(file.cases[0].status, FixtureStatus::Active);
        assert!(file.cases[0].args.is_empty());
        assert_eq!(file.cases[1].args, vec![("1".to_string(), "a".to_string())]);
        assert_eq!(file.cases[1].scripts, vec!["m".to_string()]);
        assert_eq!(file.cases[1].status, FixtureStatus::Xfail);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<FixtureFile, _> = toml::from_str(
            r#"
            [[case]]
            name = "x"
            input = ""
            expected = ""
            expect = "typo"
            "#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn filter_matches_substrings() {
        let filter = FixtureFilter {
            needle: Some("link".to_string()),
        };
        assert!(filter.matches("link-target"));
        assert!(!filter.matches("script"));
        assert!(FixtureFilter::default().matches("anything"));
    }
}
