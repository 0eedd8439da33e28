//! Worker diagnostics and host issues.
//!
//! A [`Diagnostic`] speaks the worker's vocabulary (stylelint rule keys).
//! An [`Issue`] speaks the host's (repository-qualified rule keys) and is
//! only produced once a diagnostic has been mapped to an active rule.

use std::fmt;

use crate::file::InputFile;

/// Host rule identifier, e.g. `css:S4647`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleKey {
    repository: String,
    rule: String,
}

impl RuleKey {
    #[must_use]
    pub fn new(repository: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            rule: rule.into(),
        }
    }

    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.rule)
    }
}

/// One element of a worker response.
///
/// `rule` is the worker's native key. `message` is raw and may still carry
/// a trailing `(rule-id)` suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    line: u32,
    rule: String,
    message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(line: u32, rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            line,
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// 1-indexed line number.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn rule(&self) -> &str {
        &self.rule
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The worker could not parse a file at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    line: u32,
    message: String,
}

impl ParseFailure {
    #[must_use]
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result of analyzing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Diagnostics(Vec<Diagnostic>),
    ParseFailure(ParseFailure),
}

impl AnalysisOutcome {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Diagnostics(items) if items.is_empty())
    }
}

/// A rule violation ready for the host's issue sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    file: InputFile,
    rule: RuleKey,
    line: u32,
    message: String,
}

impl Issue {
    #[must_use]
    pub fn new(file: InputFile, rule: RuleKey, line: u32, message: impl Into<String>) -> Self {
        Self {
            file,
            rule,
            line,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn file(&self) -> &InputFile {
        &self.file
    }

    #[must_use]
    pub fn rule(&self) -> &RuleKey {
        &self.rule
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Host classification of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    Bug,
    CodeSmell,
}

impl RuleType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::CodeSmell => "code_smell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Minor,
    Major,
    Critical,
    Blocker,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
            Self::Blocker => "blocker",
        }
    }
}

/// An issue raised by a tool other than the worker, imported as-is.
///
/// Unlike an [`Issue`] it carries its own classification, since the host
/// has no rule definition to take it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIssue {
    issue: Issue,
    rule_type: RuleType,
    severity: Severity,
    effort_minutes: u32,
}

impl ExternalIssue {
    #[must_use]
    pub fn new(issue: Issue, rule_type: RuleType, severity: Severity, effort_minutes: u32) -> Self {
        Self {
            issue,
            rule_type,
            severity,
            effort_minutes,
        }
    }

    #[must_use]
    pub fn issue(&self) -> &Issue {
        &self.issue
    }

    #[must_use]
    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Estimated remediation effort.
    #[must_use]
    pub fn effort_minutes(&self) -> u32 {
        self.effort_minutes
    }
}
