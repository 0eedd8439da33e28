//! Worker runtime (Node.js) resolution and version check.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio::process::Command;

/// Oldest major version able to run the worker.
pub const MIN_SUPPORTED_VERSION: u32 = 8;

/// Versions below this work but are on their way out.
pub const MIN_RECOMMENDED_VERSION: u32 = 10;

const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?(\d+)\.\d+\.\d+").expect("version pattern is valid"));

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("'{command}' not found in PATH: {source}")]
    NotFound {
        command: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to run '{} -v': {reason}", program.display())]
    VersionCheck { program: PathBuf, reason: String },
    #[error("failed to parse Node.js version from '{output}'")]
    UnparsableVersion { output: String },
    #[error(
        "Only Node.js v{MIN_SUPPORTED_VERSION} or later is supported, got {major}. \
         Please upgrade Node.js."
    )]
    Unsupported { major: u32 },
}

/// A runtime that passed the version check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedRuntime {
    program: PathBuf,
    major: u32,
}

impl CheckedRuntime {
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn major(&self) -> u32 {
        self.major
    }

    /// Deprecation notice for old-but-supported versions.
    #[must_use]
    pub fn deprecation_notice(&self) -> Option<String> {
        (self.major < MIN_RECOMMENDED_VERSION).then(|| {
            format!(
                "Using Node.js version {} to execute analysis is deprecated and will stop being \
                 supported in a future release. Please upgrade to a newer LTS version of Node.js \
                 (v{MIN_RECOMMENDED_VERSION} or later).",
                self.major
            )
        })
    }
}

/// Resolve a runtime name (or path) to an executable.
pub fn resolve(command: &str) -> Result<PathBuf, RuntimeError> {
    which::which(command).map_err(|source| RuntimeError::NotFound {
        command: command.to_string(),
        source,
    })
}

/// Parse the major version out of `node -v` output such as `v12.16.1`.
#[must_use]
pub fn parse_major_version(output: &str) -> Option<u32> {
    VERSION_PATTERN
        .captures(output.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Check a parsed major version against the supported range.
pub fn check_major(major: u32) -> Result<(), RuntimeError> {
    if major < MIN_SUPPORTED_VERSION {
        return Err(RuntimeError::Unsupported { major });
    }
    Ok(())
}

/// Resolve `command`, run `<command> -v`, and validate the reported version.
pub async fn check(command: &str) -> Result<CheckedRuntime, RuntimeError> {
    let program = resolve(command)?;
    let output = tokio::time::timeout(
        VERSION_CHECK_TIMEOUT,
        Command::new(&program).arg("-v").kill_on_drop(true).output(),
    )
    .await
    .map_err(|_| RuntimeError::VersionCheck {
        program: program.clone(),
        reason: "timed out".to_string(),
    })?
    .map_err(|e| RuntimeError::VersionCheck {
        program: program.clone(),
        reason: e.to_string(),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let major = parse_major_version(&stdout).ok_or_else(|| RuntimeError::UnparsableVersion {
        output: stdout.trim().to_string(),
    })?;
    check_major(major)?;
    tracing::debug!(program = %program.display(), major, "Using Node.js runtime");

    Ok(CheckedRuntime { program, major })
}
