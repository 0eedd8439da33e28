//! Core domain types for stylebridge.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The bridge, the analyzer and the CLI host all speak in these terms.

mod file;
mod issue;
mod request;
mod rule;

pub mod text;

pub use file::{Charset, FileKind, InputFile};
pub use issue::{
    AnalysisOutcome, Diagnostic, ExternalIssue, Issue, ParseFailure, RuleKey, RuleType, Severity,
};
pub use request::{AnalysisRequest, ContentPolicy, HostMode};
pub use rule::{ActiveRule, RuleParamError};
