//! Per-file analysis requests and the policy deciding what goes in them.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::file::InputFile;

/// Immutable request for one file.
///
/// The worker reads `file_path` from disk unless `file_content` is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    file_path: PathBuf,
    file_content: Option<String>,
    config_file: PathBuf,
}

impl AnalysisRequest {
    #[must_use]
    pub fn new(file_path: impl Into<PathBuf>, config_file: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            file_content: None,
            config_file: config_file.into(),
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.file_content = Some(content.into());
        self
    }

    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    #[must_use]
    pub fn file_content(&self) -> Option<&str> {
        self.file_content.as_deref()
    }

    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }
}

/// How the host is driving the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostMode {
    /// Whole-project scan; files on disk are authoritative.
    #[default]
    Batch,
    /// Editor or one-shot host; buffers may differ from disk.
    Interactive,
}

/// When raw file content is embedded in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentPolicy {
    Always,
    Never,
    /// Interactive hosts, or files whose charset is not UTF-8.
    #[default]
    WhenUntrusted,
}

impl ContentPolicy {
    #[must_use]
    pub fn should_send(self, mode: HostMode, file: &InputFile) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::WhenUntrusted => mode == HostMode::Interactive || !file.charset().is_utf8(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Charset;

    fn utf8_file() -> InputFile {
        InputFile::from_path(&std::env::temp_dir().join("a.css"), "css").unwrap()
    }

    #[test]
    fn untrusted_policy_skips_utf8_batch_files() {
        let file = utf8_file();
        assert!(!ContentPolicy::WhenUntrusted.should_send(HostMode::Batch, &file));
        assert!(ContentPolicy::WhenUntrusted.should_send(HostMode::Interactive, &file));
    }

    #[test]
    fn untrusted_policy_sends_foreign_charset() {
        let file = utf8_file().with_charset(Charset::from_label("ISO-8859-1"));
        assert!(ContentPolicy::WhenUntrusted.should_send(HostMode::Batch, &file));
    }

    #[test]
    fn fixed_policies_ignore_mode() {
        let file = utf8_file();
        assert!(ContentPolicy::Always.should_send(HostMode::Batch, &file));
        assert!(!ContentPolicy::Never.should_send(HostMode::Interactive, &file));
    }

    #[test]
    fn policy_deserializes_kebab_case() {
        let policy: ContentPolicy = serde_json::from_str("\"when-untrusted\"").unwrap();
        assert_eq!(policy, ContentPolicy::WhenUntrusted);
        let mode: HostMode = serde_json::from_str("\"interactive\"").unwrap();
        assert_eq!(mode, HostMode::Interactive);
    }

    #[test]
    fn request_content_is_optional() {
        let request = AnalysisRequest::new("/a/b.css", "/work/stylelintconfig.json");
        assert_eq!(request.file_content(), None);
        let request = request.with_content("a { color: red; }");
        assert_eq!(request.file_content(), Some("a { color: red; }"));
    }
}
