//! Capabilities the host platform lends to an analysis run.

use std::io;
use std::path::Path;

use stylebridge_types::{ExternalIssue, InputFile, Issue};

/// File enumeration and access.
pub trait FileSystem: Send + Sync {
    /// Every indexed file, in the order the host wants them analyzed.
    fn input_files(&self) -> Vec<InputFile>;

    /// Scratch directory for the run; the rule configuration is written here.
    fn work_dir(&self) -> &Path;

    /// Contents of `file` decoded with its declared charset.
    fn read_contents(&self, file: &InputFile) -> io::Result<String>;
}

/// Where reported issues go.
pub trait IssueSink: Send {
    fn save(&mut self, issue: Issue);
}

impl IssueSink for Vec<Issue> {
    fn save(&mut self, issue: Issue) {
        self.push(issue);
    }
}

/// Where issues imported from other tools go.
pub trait ExternalIssueSink: Send {
    fn save_external(&mut self, issue: ExternalIssue);
}

impl ExternalIssueSink for Vec<ExternalIssue> {
    fn save_external(&mut self, issue: ExternalIssue) {
        self.push(issue);
    }
}
