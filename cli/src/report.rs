//! Issue rendering for stdout.

use std::io::{self, Write};
use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;
use stylebridge_types::{ExternalIssue, Issue};

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// One `<path>:<line>: <message> [<rule>]` line per issue.
    Text,
    /// A JSON array of issue objects.
    Json,
}

#[derive(Debug, Serialize)]
struct JsonIssue<'a> {
    path: String,
    line: u32,
    rule: String,
    message: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    rule_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<&'static str>,
}

impl<'a> JsonIssue<'a> {
    fn new(root: &Path, issue: &'a Issue) -> Self {
        Self {
            path: display_path(root, issue),
            line: issue.line(),
            rule: issue.rule().to_string(),
            message: issue.message(),
            rule_type: None,
            severity: None,
        }
    }

    fn external(root: &Path, external: &'a ExternalIssue) -> Self {
        Self {
            rule_type: Some(external.rule_type().as_str()),
            severity: Some(external.severity().as_str()),
            ..Self::new(root, external.issue())
        }
    }
}

/// Path relative to `root` when possible, else the file URI.
fn display_path(root: &Path, issue: &Issue) -> String {
    match issue.file().local_path() {
        Some(path) => path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/"),
        None => issue.file().to_string(),
    }
}

/// Bridge issues first, then imported ones.
pub fn write_issues(
    out: &mut impl Write,
    format: OutputFormat,
    root: &Path,
    issues: &[Issue],
    external: &[ExternalIssue],
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            for issue in issues.iter().chain(external.iter().map(ExternalIssue::issue)) {
                writeln!(
                    out,
                    "{}:{}: {} [{}]",
                    display_path(root, issue),
                    issue.line(),
                    issue.message(),
                    issue.rule()
                )?;
            }
        }
        OutputFormat::Json => {
            let records: Vec<JsonIssue<'_>> = issues
                .iter()
                .map(|issue| JsonIssue::new(root, issue))
                .chain(external.iter().map(|e| JsonIssue::external(root, e)))
                .collect();
            serde_json::to_writer_pretty(&mut *out, &records).map_err(io::Error::other)?;
            writeln!(out)?;
        }
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use stylebridge_types::{InputFile, RuleKey, RuleType, Severity};

    use super::*;

    fn issues(root: &Path) -> Vec<Issue> {
        let file = InputFile::from_path(&root.join("src").join("app.css"), "css").unwrap();
        vec![
            Issue::new(
                file.clone(),
                RuleKey::new("css", "S4658"),
                3,
                "Unexpected empty block",
            ),
            Issue::new(
                file,
                RuleKey::new("css", "S4647"),
                7,
                "Unexpected invalid hex color \"#y3\"",
            ),
        ]
    }

    fn imported(root: &Path) -> Vec<ExternalIssue> {
        let file = InputFile::from_path(&root.join("src").join("app.css"), "css").unwrap();
        vec![ExternalIssue::new(
            Issue::new(
                file,
                RuleKey::new("stylelint", "max-nesting-depth"),
                12,
                "Expected nesting depth to be no more than 2",
            ),
            RuleType::CodeSmell,
            Severity::Major,
            5,
        )]
    }

    fn render(format: OutputFormat, root: &Path, issues: &[Issue]) -> String {
        render_all(format, root, issues, &[])
    }

    fn render_all(
        format: OutputFormat,
        root: &Path,
        issues: &[Issue],
        external: &[ExternalIssue],
    ) -> String {
        let mut out = Vec::new();
        write_issues(&mut out, format, root, issues, external).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn text_lines_are_project_relative() {
        let dir = tempfile::tempdir().unwrap();
        let text = render(OutputFormat::Text, dir.path(), &issues(dir.path()));
        assert_eq!(
            text,
            "src/app.css:3: Unexpected empty block [css:S4658]\n\
             src/app.css:7: Unexpected invalid hex color \"#y3\" [css:S4647]\n"
        );
    }

    #[test]
    fn json_is_an_array_of_records() {
        let dir = tempfile::tempdir().unwrap();
        let json = render(OutputFormat::Json, dir.path(), &issues(dir.path()));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([
                {"path": "src/app.css", "line": 3, "rule": "css:S4658", "message": "Unexpected empty block"},
                {"path": "src/app.css", "line": 7, "rule": "css:S4647", "message": "Unexpected invalid hex color \"#y3\""}
            ])
        );
    }

    #[test]
    fn imported_issues_follow_bridge_issues() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = issues(dir.path());
        let text = render_all(OutputFormat::Text, dir.path(), &bridge[..1], &imported(dir.path()));
        assert_eq!(
            text,
            "src/app.css:3: Unexpected empty block [css:S4658]\n\
             src/app.css:12: Expected nesting depth to be no more than 2 [stylelint:max-nesting-depth]\n"
        );
    }

    #[test]
    fn imported_json_records_carry_classification() {
        let dir = tempfile::tempdir().unwrap();
        let json = render_all(OutputFormat::Json, dir.path(), &[], &imported(dir.path()));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([{
                "path": "src/app.css",
                "line": 12,
                "rule": "stylelint:max-nesting-depth",
                "message": "Expected nesting depth to be no more than 2",
                "type": "code_smell",
                "severity": "major"
            }])
        );
    }

    #[test]
    fn no_issues_renders_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(render(OutputFormat::Text, dir.path(), &[]), "");
        assert_eq!(render(OutputFormat::Json, dir.path(), &[]).trim(), "[]");
    }
}
