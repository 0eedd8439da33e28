//! CSS analysis on top of the worker bridge.
//!
//! [`RuleSensor`] enumerates a host's files, writes the rule configuration,
//! makes sure the worker is up, and feeds files to it one at a time. Startup
//! and protocol failures degrade the run to a host warning unless fail-fast
//! is configured; cancellation is honored between files and mid-request.
//!
//! [`ExternalReportImporter`] brings in issues from stylelint reports that
//! were produced outside the bridge.

mod cancel;
mod external;
mod host;
mod message;
mod progress;
mod rules;
mod sensor;
mod warnings;

pub use cancel::{CancelSignal, Cancelled};
pub use external::{
    EXTERNAL_EFFORT_MINUTES, EXTERNAL_REPOSITORY, EXTERNAL_SEVERITY, ExternalReportImporter,
    ImportSummary, external_rule_type,
};
pub use host::{ExternalIssueSink, FileSystem, IssueSink};
pub use message::normalize_message;
pub use progress::ProgressReport;
pub use rules::{
    CONFIG_FILE_NAME, CssRules, REPOSITORY_KEY, RulesError, catalog_keys, default_active_rules,
};
pub use sensor::{
    AnalysisError, AnalysisSummary, CSS_LANGUAGE, RuleSensor, RunStatus, SensorSettings,
};
pub use warnings::AnalysisWarnings;
