//! Input files as the host enumerates them.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

/// Whether a file belongs to production sources or to tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Main,
    Test,
}

/// Declared on-disk encoding of a file.
///
/// Only UTF-8 is trusted to be read by the worker directly from disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Other(String),
}

impl Charset {
    /// Parse a charset label. `utf-8`, `UTF8` and friends map to [`Charset::Utf8`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect();
        if normalized.eq_ignore_ascii_case("utf8") {
            Self::Utf8
        } else {
            Self::Other(label.trim().to_string())
        }
    }

    #[must_use]
    pub fn is_utf8(&self) -> bool {
        matches!(self, Self::Utf8)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Utf8 => f.write_str("UTF-8"),
            Self::Other(label) => f.write_str(label),
        }
    }
}

/// A file handed over by the host for analysis.
///
/// The location is a URI: hosts may index virtual or remote files, which
/// have no local path and cannot be given to a local worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputFile {
    uri: Url,
    language: String,
    kind: FileKind,
    charset: Charset,
}

impl InputFile {
    #[must_use]
    pub fn new(uri: Url, language: impl Into<String>, kind: FileKind, charset: Charset) -> Self {
        Self {
            uri,
            language: language.into(),
            kind,
            charset,
        }
    }

    /// Build a main, UTF-8 file from an absolute local path.
    ///
    /// Returns `None` when the path is relative.
    #[must_use]
    pub fn from_path(path: &Path, language: impl Into<String>) -> Option<Self> {
        let uri = Url::from_file_path(path).ok()?;
        Some(Self::new(uri, language, FileKind::Main, Charset::Utf8))
    }

    #[must_use]
    pub fn with_kind(mut self, kind: FileKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    #[must_use]
    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    /// Absolute local path, or `None` for non-`file:` locations.
    #[must_use]
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.uri.scheme() != "file" {
            return None;
        }
        self.uri.to_file_path().ok()
    }
}

impl fmt::Display for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.uri, f)
    }
}
