//! Bridge lifecycle manager: one supervised worker behind a mutex-guarded
//! state machine.
//!
//! ```text
//! NotStarted --ensure_running--> Starting --listener up--> Running
//!                                   |                        |
//!                                   +--launch/startup fail   +--stop--> NotStarted
//!                                   v
//!                           FailedPermanently (latched for the manager's lifetime)
//! ```

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use stylebridge_types::{AnalysisOutcome, AnalysisRequest};
use tokio::sync::Mutex;

use crate::bundle::WorkerBundle;
use crate::client::BridgeClient;
use crate::error::BridgeError;
use crate::net::{find_open_port, wait_for_listener};
use crate::process::{WorkerCommand, WorkerProcess};
use crate::runtime;

/// Host the worker is reached on. The worker listens on all interfaces of
/// its port; the bridge only ever talks to it over IPv4 loopback.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Starting,
    Running,
    FailedPermanently,
}

/// How workers are launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    timeout: Duration,
    max_old_space_size: Option<NonZeroU32>,
    runtime: Option<String>,
    check_runtime_version: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_old_space_size: None,
            runtime: Some("node".to_string()),
            check_runtime_version: true,
        }
    }
}

impl BridgeSettings {
    /// Startup timeout; also bounds every request to the worker.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Heap limit in megabytes, passed as `NODE_OPTIONS=--max-old-space-size`.
    #[must_use]
    pub fn with_max_old_space_size(mut self, megabytes: Option<NonZeroU32>) -> Self {
        self.max_old_space_size = megabytes;
        self
    }

    /// Interpreter for the entry point. `None` executes the entry point itself.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Option<String>) -> Self {
        self.runtime = runtime;
        self
    }

    #[must_use]
    pub fn with_runtime_version_check(mut self, check: bool) -> Self {
        self.check_runtime_version = check;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// The live worker: a process plus a client bound to its port.
struct RunningWorker {
    process: WorkerProcess,
    client: BridgeClient,
}

struct Inner {
    state: LifecycleState,
    worker: Option<RunningWorker>,
    last_command: Option<WorkerCommand>,
}

/// Owns at most one worker and serializes every transition.
///
/// Shared across analyses of a long-lived host; clone an `Arc` of it rather
/// than creating one per analysis, or the failure latch is lost.
pub struct BridgeServer {
    bundle: Box<dyn WorkerBundle>,
    settings: BridgeSettings,
    inner: Mutex<Inner>,
    launches: AtomicU32,
    notices: StdMutex<Vec<String>>,
}

impl BridgeServer {
    #[must_use]
    pub fn new(bundle: impl WorkerBundle + 'static, settings: BridgeSettings) -> Self {
        Self {
            bundle: Box::new(bundle),
            settings,
            inner: Mutex::new(Inner {
                state: LifecycleState::NotStarted,
                worker: None,
                last_command: None,
            }),
            launches: AtomicU32::new(0),
            notices: StdMutex::new(Vec::new()),
        }
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.lock().await.state
    }

    /// Number of worker processes spawned so far.
    #[must_use]
    pub fn launch_count(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }

    /// Drain user-facing notices produced while starting (e.g. runtime deprecation).
    pub fn take_notices(&self) -> Vec<String> {
        match self.notices.lock() {
            Ok(mut notices) => std::mem::take(&mut *notices),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn push_notice(&self, notice: String) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }

    /// Description of the last launch command, for troubleshooting output.
    pub async fn command_info(&self) -> String {
        match &self.inner.lock().await.last_command {
            Some(command) => format!(
                "Command to start {} server was: {command}",
                self.bundle.name()
            ),
            None => format!(
                "Command to start {} server was not built yet.",
                self.bundle.name()
            ),
        }
    }

    /// Make sure a healthy worker is running, starting one if needed.
    ///
    /// - Fails with [`BridgeError::AlreadyFailed`] after any earlier startup failure.
    /// - Returns immediately if the current worker answers its health check.
    /// - Otherwise deploys, allocates a port, launches, and waits for the
    ///   listener. Any failure latches [`LifecycleState::FailedPermanently`].
    pub async fn ensure_running(&self) -> Result<(), BridgeError> {
        let mut inner = self.inner.lock().await;

        if inner.state == LifecycleState::FailedPermanently {
            return Err(BridgeError::AlreadyFailed);
        }

        let current = inner.worker.as_ref().map(|worker| worker.client.clone());
        if let Some(client) = current
            && client.is_alive().await
        {
            tracing::debug!("{} server is up, no need to start", self.bundle.name());
            inner.state = LifecycleState::Running;
            return Ok(());
        }

        if let Some(mut stale) = inner.worker.take() {
            match stale.process.try_exit_status() {
                Some(status) => tracing::warn!(
                    pid = stale.process.pid(),
                    "{} server exited ({status}), restarting",
                    self.bundle.name()
                ),
                None => tracing::warn!(
                    pid = stale.process.pid(),
                    "{} server stopped answering, restarting",
                    self.bundle.name()
                ),
            }
            stale.process.kill().await;
        }

        inner.state = LifecycleState::Starting;
        match self.start(&mut inner).await {
            Ok(worker) => {
                inner.worker = Some(worker);
                inner.state = LifecycleState::Running;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to start {} server: {e}", self.bundle.name());
                inner.state = LifecycleState::FailedPermanently;
                Err(e)
            }
        }
    }

    async fn start(&self, inner: &mut Inner) -> Result<RunningWorker, BridgeError> {
        self.bundle.deploy()?;
        let port = find_open_port()?;

        let entry = self.bundle.entry_point();
        if !entry.is_file() {
            return Err(BridgeError::MissingEntryPoint {
                bundle: self.bundle.name().to_string(),
                path: entry,
            });
        }

        let command = self.build_command(entry, port).await?;
        inner.last_command = Some(command.clone());
        let client = BridgeClient::new(LOOPBACK_HOST, port, self.settings.timeout)?;

        tracing::debug!(port, "Starting {} server: {command}", self.bundle.name());
        self.launches.fetch_add(1, Ordering::SeqCst);
        let mut process = WorkerProcess::launch(&command)?;

        let ready = tokio::select! {
            found = wait_for_listener(LOOPBACK_HOST, port, self.settings.timeout) => {
                if found {
                    Ok(())
                } else {
                    Err(BridgeError::StartupTimeout { timeout: self.settings.timeout })
                }
            }
            status = process.wait_exit() => {
                Err(BridgeError::StartupExited { status: status.to_string() })
            }
        };

        if let Err(e) = ready {
            process.kill().await;
            return Err(e);
        }

        tracing::info!(
            port,
            pid = process.pid(),
            elapsed_ms = process.started_at().elapsed().as_millis() as u64,
            "{} server is up",
            self.bundle.name()
        );
        Ok(RunningWorker { process, client })
    }

    async fn build_command(&self, entry: PathBuf, port: u16) -> Result<WorkerCommand, BridgeError> {
        let command = match self.settings.runtime.as_deref() {
            Some(runtime) if self.settings.check_runtime_version => {
                let checked = runtime::check(runtime).await?;
                if let Some(notice) = checked.deprecation_notice() {
                    tracing::warn!("{notice}");
                    self.push_notice(notice);
                }
                WorkerCommand::new(checked.program()).arg(entry)
            }
            Some(runtime) => WorkerCommand::new(runtime).arg(entry),
            None => WorkerCommand::new(entry),
        };
        let command = command.arg(port.to_string());
        Ok(match self.settings.max_old_space_size {
            Some(megabytes) => {
                command.env("NODE_OPTIONS", format!("--max-old-space-size={megabytes}"))
            }
            None => command,
        })
    }

    /// Health check of the current worker; `false` when none is running.
    pub async fn is_alive(&self) -> bool {
        let client = match &self.inner.lock().await.worker {
            Some(worker) => worker.client.clone(),
            None => return false,
        };
        client.is_alive().await
    }

    /// Analyze one file on the current worker.
    ///
    /// The lock is released before the request goes out, so a slow file does
    /// not block `stop()`.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome, BridgeError> {
        let client = match &self.inner.lock().await.worker {
            Some(worker) => worker.client.clone(),
            None => return Err(BridgeError::NotRunning),
        };
        client.analyze(request).await
    }

    /// Ask the worker to close, terminate it, and return to `NotStarted`.
    ///
    /// A permanent failure stays latched.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(mut worker) = inner.worker.take() {
            let closed = tokio::time::timeout(CLOSE_TIMEOUT, worker.client.close())
                .await
                .unwrap_or(false);
            if !closed {
                tracing::debug!("{} server did not acknowledge /close", self.bundle.name());
            }
            worker.process.terminate().await;
            tracing::info!("{} server stopped", self.bundle.name());
        }
        if inner.state != LifecycleState::FailedPermanently {
            inner.state = LifecycleState::NotStarted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::InstalledBundle;

    fn server_in(dir: &std::path::Path) -> BridgeServer {
        BridgeServer::new(
            InstalledBundle::new("css-bundle", dir, "bin/server"),
            BridgeSettings::default()
                .with_runtime(None)
                .with_timeout(Duration::from_secs(1)),
        )
    }

    #[tokio::test]
    async fn fresh_server_is_not_started() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(dir.path());
        assert_eq!(server.state().await, LifecycleState::NotStarted);
        assert!(!server.is_alive().await);
        assert_eq!(server.launch_count(), 0);
    }

    #[tokio::test]
    async fn command_info_before_launch() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(dir.path());
        assert_eq!(
            server.command_info().await,
            "Command to start css-bundle server was not built yet."
        );
    }

    #[tokio::test]
    async fn analyze_without_worker_is_not_running() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(dir.path());
        let request = AnalysisRequest::new("/a/b.css", "/c.json");
        assert!(matches!(
            server.analyze(&request).await,
            Err(BridgeError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn missing_entry_point_latches_failure() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(dir.path());

        let err = server.ensure_running().await.unwrap_err();
        assert!(matches!(err, BridgeError::MissingEntryPoint { .. }));
        assert_eq!(server.state().await, LifecycleState::FailedPermanently);
        assert_eq!(server.launch_count(), 0);

        assert!(matches!(
            server.ensure_running().await,
            Err(BridgeError::AlreadyFailed)
        ));
    }

    #[tokio::test]
    async fn missing_bundle_is_bundle_error() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(&dir.path().join("not-deployed"));
        let err = server.ensure_running().await.unwrap_err();
        assert!(matches!(err, BridgeError::Bundle(_)));
        assert!(err.is_startup_failure());
    }

    #[tokio::test]
    async fn stop_keeps_failure_latched() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(dir.path());
        let _ = server.ensure_running().await;

        server.stop().await;
        assert_eq!(server.state().await, LifecycleState::FailedPermanently);
    }

    #[tokio::test]
    async fn stop_without_worker_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let server = server_in(dir.path());
        server.stop().await;
        server.stop().await;
        assert_eq!(server.state().await, LifecycleState::NotStarted);
    }

    #[tokio::test]
    async fn memory_hint_goes_to_node_options() {
        let dir = tempfile::tempdir().unwrap();
        let server = BridgeServer::new(
            InstalledBundle::new("css-bundle", dir.path(), "bin/server"),
            BridgeSettings::default()
                .with_runtime(Some("node".to_string()))
                .with_runtime_version_check(false)
                .with_max_old_space_size(NonZeroU32::new(2048)),
        );
        let command = server
            .build_command(PathBuf::from("/b/bin/server"), 4242)
            .await
            .unwrap();
        assert_eq!(
            command.to_string(),
            "NODE_OPTIONS=--max-old-space-size=2048 node /b/bin/server 4242"
        );
    }
}
