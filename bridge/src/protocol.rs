//! Wire records for the worker's HTTP/JSON protocol.
//!
//! ```text
//! GET  /status   -> "OK!"
//! POST /analyze  {"filePath", "fileContent", "configFile"} -> [{"line", "rule", "text"}]
//! POST /close    -> worker shuts down
//! ```

use serde::{Deserialize, Serialize};
use stylebridge_types::{AnalysisOutcome, AnalysisRequest, Diagnostic, ParseFailure};

/// Exact body of a healthy `/status` response.
pub const STATUS_OK: &str = "OK!";

/// Rule name the worker uses for files it cannot parse.
pub const SYNTAX_ERROR_RULE: &str = "CssSyntaxError";

/// Body of `POST /analyze`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRequest<'a> {
    file_path: String,
    file_content: Option<&'a str>,
    config_file: String,
}

impl<'a> From<&'a AnalysisRequest> for WireRequest<'a> {
    fn from(request: &'a AnalysisRequest) -> Self {
        Self {
            file_path: request.file_path().to_string_lossy().into_owned(),
            file_content: request.file_content(),
            config_file: request.config_file().to_string_lossy().into_owned(),
        }
    }
}

/// One element of the `/analyze` response array.
///
/// All three fields are required; a response missing any of them is a
/// protocol error rather than a silently empty diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct WireIssue {
    line: u32,
    rule: String,
    text: String,
}

/// Convert a decoded response into an outcome.
///
/// The first syntax-error entry wins: a file that failed to parse has no
/// meaningful rule diagnostics.
pub(crate) fn into_outcome(issues: Vec<WireIssue>) -> AnalysisOutcome {
    if let Some(syntax) = issues.iter().find(|i| i.rule == SYNTAX_ERROR_RULE) {
        return AnalysisOutcome::ParseFailure(ParseFailure::new(
            syntax.line,
            strip_syntax_marker(&syntax.text),
        ));
    }
    AnalysisOutcome::Diagnostics(
        issues
            .into_iter()
            .map(|i| Diagnostic::new(i.line, i.rule, i.text))
            .collect(),
    )
}

fn strip_syntax_marker(text: &str) -> String {
    text.replace(&format!("({SYNTAX_ERROR_RULE})"), "")
        .trim()
        .to_string()
}
