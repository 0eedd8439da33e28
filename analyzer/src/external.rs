//! Import of stylelint JSON reports produced outside the bridge.
//!
//! A report is the output of `stylelint --formatter json`:
//!
//! ```text
//! [{"source": "<path>", "warnings": [{"line", "rule", "text", ...}]}]
//! ```
//!
//! Warnings become [`ExternalIssue`]s in the `stylelint` repository, except
//! for rules the bridge already runs, which would otherwise be reported twice.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use stylebridge_types::{ExternalIssue, InputFile, Issue, RuleKey, RuleType, Severity};

use crate::host::ExternalIssueSink;
use crate::rules::CssRules;

/// Repository of imported rules.
pub const EXTERNAL_REPOSITORY: &str = "stylelint";

pub const EXTERNAL_SEVERITY: Severity = Severity::Major;

pub const EXTERNAL_EFFORT_MINUTES: u32 = 5;

/// stylelint rules whose violations are bugs rather than code smells.
const BUG_RULES: &[&str] = &[
    "at-rule-no-unknown",
    "color-no-invalid-hex",
    "declaration-block-no-duplicate-properties",
    "declaration-block-no-shorthand-property-overrides",
    "font-family-no-missing-generic-family-keyword",
    "function-calc-no-unspaced-operator",
    "function-linear-gradient-no-nonstandard-direction",
    "keyframe-declaration-no-important",
    "no-descending-specificity",
    "no-invalid-double-slash-comments",
    "property-no-unknown",
    "selector-pseudo-class-no-unknown",
    "selector-pseudo-element-no-unknown",
    "selector-type-no-unknown",
    "unit-no-unknown",
];

#[derive(Debug, Deserialize)]
struct ReportedFile {
    source: String,
    #[serde(default)]
    warnings: Vec<ReportedWarning>,
}

#[derive(Debug, Deserialize)]
struct ReportedWarning {
    line: u32,
    rule: String,
    text: String,
}

#[must_use]
pub fn external_rule_type(stylelint_key: &str) -> RuleType {
    if BUG_RULES.contains(&stylelint_key) {
        RuleType::Bug
    } else {
        RuleType::CodeSmell
    }
}

/// Counters of one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub reports_read: usize,
    pub reports_failed: usize,
    pub issues_imported: usize,
    pub skipped_active: usize,
    pub unknown_files: usize,
}

/// Turns stylelint reports into external issues on indexed files.
pub struct ExternalReportImporter<'a> {
    rules: &'a CssRules,
    base_dir: &'a Path,
    files: &'a [InputFile],
}

impl<'a> ExternalReportImporter<'a> {
    /// `base_dir` resolves relative report paths and relative `source`s.
    #[must_use]
    pub fn new(rules: &'a CssRules, base_dir: &'a Path, files: &'a [InputFile]) -> Self {
        Self {
            rules,
            base_dir,
            files,
        }
    }

    /// Import every report. Unreadable or malformed reports are logged and
    /// skipped; they never fail the run.
    pub fn import<S: ExternalIssueSink>(
        &self,
        reports: &[PathBuf],
        sink: &mut S,
    ) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for report in reports {
            let path = self.resolve(report);
            tracing::info!("Importing {}", path.display());
            match read_report(&path) {
                Ok(files) => {
                    summary.reports_read += 1;
                    for reported in files {
                        self.import_file(reported, sink, &mut summary);
                    }
                }
                Err(ReportError::Read(e)) => {
                    tracing::error!(
                        "No issues information will be saved as the report file {} can't be read: {e}",
                        path.display()
                    );
                    summary.reports_failed += 1;
                }
                Err(ReportError::Parse(e)) => {
                    tracing::error!(
                        "Failed to parse json stylelint report {}: {e}",
                        path.display()
                    );
                    summary.reports_failed += 1;
                }
            }
        }
        summary
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn import_file<S: ExternalIssueSink>(
        &self,
        reported: ReportedFile,
        sink: &mut S,
        summary: &mut ImportSummary,
    ) {
        let Some(file) = self.input_file(&reported.source) else {
            tracing::warn!(
                "No input file found for {}. No stylelint issues will be imported on this file.",
                reported.source
            );
            summary.unknown_files += 1;
            return;
        };

        for warning in reported.warnings {
            if let Some(active) = self.rules.active_rule_key(&warning.rule) {
                tracing::debug!(
                    "Stylelint issue for rule '{}' is skipped because this rule is active as {active}",
                    warning.rule
                );
                summary.skipped_active += 1;
                continue;
            }
            let rule_type = external_rule_type(&warning.rule);
            let issue = Issue::new(
                file.clone(),
                RuleKey::new(EXTERNAL_REPOSITORY, &warning.rule),
                warning.line,
                warning.text,
            );
            sink.save_external(ExternalIssue::new(
                issue,
                rule_type,
                EXTERNAL_SEVERITY,
                EXTERNAL_EFFORT_MINUTES,
            ));
            summary.issues_imported += 1;
        }
    }

    /// Indexed file whose path is `source`, absolute or relative to the base dir.
    fn input_file(&self, source: &str) -> Option<&InputFile> {
        let wanted = self.resolve(Path::new(source));
        self.files
            .iter()
            .find(|file| file.local_path().is_some_and(|path| path == wanted))
    }
}

enum ReportError {
    Read(std::io::Error),
    Parse(serde_json::Error),
}

fn read_report(path: &Path) -> Result<Vec<ReportedFile>, ReportError> {
    let raw = fs::read_to_string(path).map_err(ReportError::Read)?;
    serde_json::from_str(&raw).map_err(ReportError::Parse)
}
