//! Out-of-process analyzer bridge.
//!
//! Launches the linter worker (a small HTTP server hosted by Node.js),
//! keeps it alive across analyses, and turns per-file requests into
//! [`AnalysisOutcome`]s.

pub mod bundle;
pub mod net;
pub mod process;
pub mod runtime;

mod client;
mod error;
mod protocol;
mod server;

use std::future::Future;

use stylebridge_types::{AnalysisOutcome, AnalysisRequest};

pub use bundle::{BundleError, InstalledBundle, WorkerBundle};
pub use client::BridgeClient;
pub use error::BridgeError;
pub use protocol::{STATUS_OK, SYNTAX_ERROR_RULE};
pub use runtime::RuntimeError;
pub use server::{BridgeServer, BridgeSettings, DEFAULT_TIMEOUT, LOOPBACK_HOST, LifecycleState};

/// What the analysis orchestrator needs from a bridge.
///
/// [`BridgeServer`] is the production implementation.
pub trait AnalyzerBridge: Send + Sync {
    fn ensure_running(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    fn is_alive(&self) -> impl Future<Output = bool> + Send;

    fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisOutcome, BridgeError>> + Send;

    /// Notices to surface to the user, drained on read.
    fn take_notices(&self) -> Vec<String> {
        Vec::new()
    }

    /// How the worker was launched, for troubleshooting a failed start.
    fn command_info(&self) -> impl Future<Output = Option<String>> + Send {
        async { None }
    }
}

impl AnalyzerBridge for BridgeServer {
    fn ensure_running(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        BridgeServer::ensure_running(self)
    }

    fn is_alive(&self) -> impl Future<Output = bool> + Send {
        BridgeServer::is_alive(self)
    }

    fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisOutcome, BridgeError>> + Send {
        BridgeServer::analyze(self, request)
    }

    fn take_notices(&self) -> Vec<String> {
        BridgeServer::take_notices(self)
    }

    async fn command_info(&self) -> Option<String> {
        Some(BridgeServer::command_info(self).await)
    }
}
