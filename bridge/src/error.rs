//! Failure taxonomy of the bridge.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::bundle::BundleError;
use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to allocate a local port: {0}")]
    ResourceExhausted(#[source] io::Error),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("worker entry point to start {bundle} server doesn't exist: {}", path.display())]
    MissingEntryPoint { bundle: String, path: PathBuf },

    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to start server ({}s timeout)", timeout.as_secs_f32())]
    StartupTimeout { timeout: Duration },

    #[error("worker exited before accepting connections ({status})")]
    StartupExited { status: String },

    #[error("worker failed to start earlier in this session; not retrying")]
    AlreadyFailed,

    #[error("worker is not running")]
    NotRunning,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("request to worker endpoint /{endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("worker answered HTTP {status} for {}:\n-----\n{payload}\n-----", file.display())]
    UnexpectedStatus {
        status: u16,
        file: PathBuf,
        payload: String,
    },

    #[error("failed to parse worker response for {}: {source}\n-----\n{payload}\n-----", file.display())]
    Protocol {
        file: PathBuf,
        payload: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BridgeError {
    /// Failures that latch the lifecycle into its permanent-failure state.
    #[must_use]
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::ResourceExhausted(_)
                | Self::Bundle(_)
                | Self::Runtime(_)
                | Self::MissingEntryPoint { .. }
                | Self::Launch { .. }
                | Self::HttpClient(_)
                | Self::StartupTimeout { .. }
                | Self::StartupExited { .. }
        )
    }

    /// Response-shape failures, as opposed to transport failures.
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::UnexpectedStatus { .. })
    }
}
