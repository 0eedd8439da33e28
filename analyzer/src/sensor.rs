//! Analysis orchestrator: drives eligible files through the bridge one at a
//! time and turns outcomes into issues.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stylebridge_bridge::{AnalyzerBridge, BridgeError};
use stylebridge_types::{
    AnalysisOutcome, AnalysisRequest, ContentPolicy, FileKind, HostMode, InputFile, Issue,
};
use thiserror::Error;

use crate::cancel::{CancelSignal, Cancelled};
use crate::host::{FileSystem, IssueSink};
use crate::message::normalize_message;
use crate::progress::ProgressReport;
use crate::rules::{CssRules, RulesError};
use crate::warnings::AnalysisWarnings;

/// Language key of files this analyzer accepts.
pub const CSS_LANGUAGE: &str = "css";

const WARNING_PREFIX: &str = "CSS files were not analyzed. ";

const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("the CSS analyzer worker stopped responding after {analyzed} of {total} files")]
    WorkerUnresponsive { analyzed: usize, total: usize },

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every eligible file went through the worker.
    Completed,
    /// Nothing to do: no active rules or no eligible files.
    Skipped,
    /// The host cancelled the run.
    Cancelled,
    /// A run-level failure was absorbed; results are partial or empty.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub status: RunStatus,
    pub files_eligible: usize,
    pub files_analyzed: usize,
    pub issues_saved: usize,
    pub parse_failures: usize,
}

impl AnalysisSummary {
    fn new(files_eligible: usize) -> Self {
        Self {
            status: RunStatus::Completed,
            files_eligible,
            files_analyzed: 0,
            issues_saved: 0,
            parse_failures: 0,
        }
    }

    fn skipped() -> Self {
        Self {
            status: RunStatus::Skipped,
            ..Self::new(0)
        }
    }
}

/// Run-level knobs of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorSettings {
    fail_fast: bool,
    content_policy: ContentPolicy,
    mode: HostMode,
    progress_interval: Duration,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            fail_fast: false,
            content_policy: ContentPolicy::default(),
            mode: HostMode::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl SensorSettings {
    /// Re-raise run-level failures instead of degrading to zero issues.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    #[must_use]
    pub fn with_content_policy(mut self, policy: ContentPolicy) -> Self {
        self.content_policy = policy;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: HostMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Runs the CSS rules over a host's files through an [`AnalyzerBridge`].
pub struct RuleSensor<B> {
    bridge: Arc<B>,
    rules: CssRules,
    settings: SensorSettings,
    warnings: AnalysisWarnings,
}

impl<B: AnalyzerBridge> RuleSensor<B> {
    #[must_use]
    pub fn new(
        bridge: Arc<B>,
        rules: CssRules,
        settings: SensorSettings,
        warnings: AnalysisWarnings,
    ) -> Self {
        Self {
            bridge,
            rules,
            settings,
            warnings,
        }
    }

    #[must_use]
    pub fn warnings(&self) -> &AnalysisWarnings {
        &self.warnings
    }

    /// Analyze every eligible file of `fs`, saving issues to `sink`.
    ///
    /// Cancellation is never an error. Other run-level failures degrade to a
    /// warning, unless fail-fast is on, in which case they are returned.
    pub async fn execute<F, S>(
        &self,
        fs: &F,
        sink: &mut S,
        cancel: &CancelSignal,
    ) -> Result<AnalysisSummary, AnalysisError>
    where
        F: FileSystem,
        S: IssueSink,
    {
        if self.rules.is_empty() {
            tracing::warn!("No rules are activated in CSS Quality Profile");
            return Ok(AnalysisSummary::skipped());
        }

        let files: Vec<InputFile> = fs
            .input_files()
            .into_iter()
            .filter(|file| file.kind() == FileKind::Main && file.language() == CSS_LANGUAGE)
            .collect();
        if files.is_empty() {
            tracing::info!("No CSS files to analyze");
            return Ok(AnalysisSummary::skipped());
        }

        let mut summary = AnalysisSummary::new(files.len());
        match self.run(&files, fs, sink, cancel, &mut summary).await {
            Ok(()) => {}
            Err(AnalysisError::Cancelled(_)) => {
                tracing::info!(
                    analyzed = summary.files_analyzed,
                    "Analysis interrupted because the host cancelled it"
                );
                summary.status = RunStatus::Cancelled;
            }
            Err(e) if self.settings.fail_fast => return Err(e),
            Err(e) => {
                tracing::error!("Failure during analysis: {e}");
                self.warnings.add_unique(format!("{WARNING_PREFIX}{e}"));
                summary.status = RunStatus::Degraded;
            }
        }
        Ok(summary)
    }

    async fn run<F, S>(
        &self,
        files: &[InputFile],
        fs: &F,
        sink: &mut S,
        cancel: &CancelSignal,
        summary: &mut AnalysisSummary,
    ) -> Result<(), AnalysisError>
    where
        F: FileSystem,
        S: IssueSink,
    {
        if cancel.is_cancelled() {
            return Err(Cancelled.into());
        }

        let config_file = self.rules.write_config(fs.work_dir())?;

        let started = self.bridge.ensure_running().await;
        for notice in self.bridge.take_notices() {
            self.warnings.add_unique(notice);
        }
        if let Err(e) = started {
            if e.is_startup_failure()
                && let Some(command) = self.bridge.command_info().await
            {
                tracing::error!("{command}");
            }
            return Err(e.into());
        }

        let progress = ProgressReport::start(files.len(), self.settings.progress_interval);
        let result = self
            .analyze_files(files, fs, sink, cancel, &config_file, &progress, summary)
            .await;
        match &result {
            Ok(()) => progress.stop(),
            Err(AnalysisError::Cancelled(_)) => progress.cancel(),
            Err(_) => {}
        }
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn analyze_files<F, S>(
        &self,
        files: &[InputFile],
        fs: &F,
        sink: &mut S,
        cancel: &CancelSignal,
        config_file: &Path,
        progress: &ProgressReport,
        summary: &mut AnalysisSummary,
    ) -> Result<(), AnalysisError>
    where
        F: FileSystem,
        S: IssueSink,
    {
        for file in files {
            if cancel.is_cancelled() {
                return Err(Cancelled.into());
            }

            let Some(path) = file.local_path() else {
                tracing::debug!("Skipping {file}, it is not a local file");
                continue;
            };

            if !cancel.guard(self.bridge.is_alive()).await? {
                return Err(AnalysisError::WorkerUnresponsive {
                    analyzed: summary.files_analyzed,
                    total: files.len(),
                });
            }

            progress.start_file(file);
            let request = self.request_for(fs, file, path, config_file);
            let outcome = cancel.guard(self.bridge.analyze(&request)).await??;
            self.save_outcome(file, outcome, sink, summary);
            progress.finish_file();
            summary.files_analyzed += 1;
        }
        Ok(())
    }

    fn request_for<F: FileSystem>(
        &self,
        fs: &F,
        file: &InputFile,
        path: PathBuf,
        config_file: &Path,
    ) -> AnalysisRequest {
        let request = AnalysisRequest::new(path, config_file);
        if !self
            .settings
            .content_policy
            .should_send(self.settings.mode, file)
        {
            return request;
        }
        match fs.read_contents(file) {
            Ok(content) => request.with_content(content),
            Err(e) => {
                tracing::warn!("Failed to read {file}, the worker will read it from disk: {e}");
                request
            }
        }
    }

    fn save_outcome<S: IssueSink>(
        &self,
        file: &InputFile,
        outcome: AnalysisOutcome,
        sink: &mut S,
        summary: &mut AnalysisSummary,
    ) {
        let diagnostics = match outcome {
            AnalysisOutcome::Diagnostics(diagnostics) => diagnostics,
            AnalysisOutcome::ParseFailure(failure) => {
                tracing::error!(
                    "Failed to parse {file}, line {}, {}",
                    failure.line(),
                    failure.message()
                );
                summary.parse_failures += 1;
                return;
            }
        };

        for diagnostic in diagnostics {
            let Some(rule) = self.rules.active_rule_key(diagnostic.rule()) else {
                tracing::error!(
                    "Unknown stylelint rule or rule not enabled: '{}'",
                    diagnostic.rule()
                );
                continue;
            };
            sink.save(Issue::new(
                file.clone(),
                rule.clone(),
                diagnostic.line(),
                normalize_message(diagnostic.message()),
            ));
            summary.issues_saved += 1;
        }
    }
}
