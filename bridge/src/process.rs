//! Process supervisor: spawns the worker, drains its output, terminates it.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::error::BridgeError;

/// Tracing target for lines printed by the worker.
pub const WORKER_LOG_TARGET: &str = "stylebridge::worker";

const GRACEFUL_EXIT_TIMEOUT: Duration = Duration::from_secs(2);

const DRAIN_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Program, arguments and extra environment for one worker launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
    env: Vec<(String, String)>,
}

impl WorkerCommand {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    #[must_use]
    pub fn envs(&self) -> &[(String, String)] {
        &self.env
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={value} ")?;
        }
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Severity marker a worker puts at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Debug,
    Warn,
    Info,
}

/// Split a worker line into its severity and message.
///
/// `DEBUG` and `WARN` prefixes are recognized; anything else is INFO.
#[must_use]
pub fn classify_line(line: &str) -> (LineLevel, &str) {
    if let Some(rest) = line.strip_prefix("DEBUG") {
        (LineLevel::Debug, rest.trim_start())
    } else if let Some(rest) = line.strip_prefix("WARN") {
        (LineLevel::Warn, rest.trim_start())
    } else {
        (LineLevel::Info, line)
    }
}

fn forward_line(line: &str) {
    match classify_line(line) {
        (LineLevel::Debug, msg) => tracing::debug!(target: WORKER_LOG_TARGET, "{msg}"),
        (LineLevel::Warn, msg) => tracing::warn!(target: WORKER_LOG_TARGET, "{msg}"),
        (LineLevel::Info, msg) => tracing::info!(target: WORKER_LOG_TARGET, "{msg}"),
    }
}

/// Forward every line of `stream` to tracing until EOF.
fn spawn_drain<R>(stream: R, label: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => forward_line(&line),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("Error reading worker {label}: {e}");
                    break;
                }
            }
        }
        tracing::trace!("Worker {label} closed");
    })
}

/// A running worker process with its output drains.
///
/// The child is spawned with `kill_on_drop`, so dropping the handle never
/// leaks the process.
#[derive(Debug)]
pub struct WorkerProcess {
    child: Option<Child>,
    pid: Option<u32>,
    started_at: Instant,
    drains: Vec<JoinHandle<()>>,
}

impl WorkerProcess {
    /// Spawn `command` with piped output.
    ///
    /// Fails with [`BridgeError::Launch`] if the program cannot be started.
    pub fn launch(command: &WorkerCommand) -> Result<Self, BridgeError> {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args())
            .envs(command.envs().iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| BridgeError::Launch {
            program: command.program().display().to_string(),
            source,
        })?;

        let mut drains = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            drains.push(spawn_drain(stdout, "stdout"));
        }
        if let Some(stderr) = child.stderr.take() {
            drains.push(spawn_drain(stderr, "stderr"));
        }

        let pid = child.id();
        tracing::debug!(pid, "Launched worker: {command}");

        Ok(Self {
            child: Some(child),
            pid,
            started_at: Instant::now(),
            drains,
        })
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.child.is_none()
    }

    /// Resolve when the process exits. Pends forever once terminated.
    ///
    /// Cancel-safe: dropping the future leaves the process untouched.
    pub async fn wait_exit(&mut self) -> ExitStatus {
        let Some(child) = self.child.as_mut() else {
            return std::future::pending().await;
        };
        match child.wait().await {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!("Failed to wait on worker: {e}");
                std::future::pending().await
            }
        }
    }

    /// Exit status if the process has already exited.
    pub fn try_exit_status(&mut self) -> Option<ExitStatus> {
        self.child.as_mut()?.try_wait().ok().flatten()
    }

    /// Stop the process and join its drains. Idempotent.
    ///
    /// Waits briefly for a voluntary exit (e.g. after `/close`), then kills.
    pub async fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        match tokio::time::timeout(GRACEFUL_EXIT_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(pid = self.pid, "Worker exited: {status}"),
            Ok(Err(e)) => tracing::debug!(pid = self.pid, "Failed to wait on worker: {e}"),
            Err(_) => {
                tracing::debug!(pid = self.pid, "Worker didn't exit in time, killing");
                if let Err(e) = child.kill().await {
                    tracing::warn!(pid = self.pid, "Failed to kill worker: {e}");
                }
            }
        }

        for drain in self.drains.drain(..) {
            if tokio::time::timeout(DRAIN_JOIN_TIMEOUT, drain).await.is_err() {
                tracing::debug!(pid = self.pid, "Worker output drain did not finish");
            }
        }
    }

    /// Kill without the graceful wait. Idempotent.
    pub async fn kill(&mut self) {
        if let Some(child) = self.child.as_mut()
            && let Err(e) = child.kill().await
        {
            tracing::debug!(pid = self.pid, "Failed to kill worker: {e}");
        }
        self.terminate().await;
    }
}
