//! stylebridge CLI - lint a project's style sheets through a supervised
//! stylelint worker.
//!
//! ```text
//! main() -> load config -> LocalFileSystem::scan() -> RuleSensor::execute()
//!                                                          |
//!                                       BridgeServer (worker process, HTTP)
//!                                                          |
//!                                      issues -> stdout, warnings -> stderr
//! ```
//!
//! Existing stylelint JSON reports given with `--stylelint-report` are imported
//! alongside, minus the rules the worker already ran.
//!
//! Exit codes: 0 when the run found nothing, 1 when it reported issues, 2 when
//! it degraded or failed.

mod fs;
mod report;

use std::io::{self, IsTerminal};
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use stylebridge_analyzer::{
    AnalysisSummary, AnalysisWarnings, CancelSignal, CssRules, ExternalReportImporter,
    RuleSensor, RunStatus, SensorSettings, default_active_rules,
};
use stylebridge_bridge::{BridgeServer, BridgeSettings, InstalledBundle};
use stylebridge_config::StylebridgeConfig;
use stylebridge_types::{ExternalIssue, HostMode, Issue};

use crate::fs::LocalFileSystem;
use crate::report::{OutputFormat, write_issues};

const BUNDLE_NAME: &str = "css-bundle";

/// Scratch directory created inside the analyzed project.
const WORK_DIR_NAME: &str = ".stylebridge";

#[derive(Debug, Parser)]
#[command(name = "stylebridge", version)]
#[command(about = "Lint a project's CSS, Less and SCSS files with stylelint")]
struct Args {
    /// Project directory to analyze
    #[arg(default_value = ".")]
    project_dir: PathBuf,

    /// Configuration file (defaults to <project>/.stylebridge.toml, then ~/.stylebridge/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the deployed worker bundle
    #[arg(long, value_name = "PATH")]
    bundle_dir: Option<PathBuf>,

    /// Fail the run when the worker cannot start or stops answering
    #[arg(long)]
    fail_fast: bool,

    /// Worker startup and per-request timeout
    #[arg(long, value_name = "SECS")]
    timeout: Option<NonZeroU64>,

    /// Issue output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Import issues from an existing stylelint JSON report (repeatable)
    #[arg(long = "stylelint-report", value_name = "PATH")]
    stylelint_reports: Vec<PathBuf>,

    /// Send file contents with each request instead of letting the worker read them
    #[arg(long)]
    interactive: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    // stdout carries the report; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .with(env_filter)
        .init();
}

fn apply_args(config: &mut StylebridgeConfig, args: &Args) {
    if args.fail_fast {
        config.set_fail_fast(true);
    }
    if let Some(secs) = args.timeout {
        config.set_timeout(Duration::from_secs(secs.get()));
    }
    if let Some(dir) = &args.bundle_dir {
        config.set_bundle_dir(dir.clone());
    }
    if args.interactive {
        config.set_mode(HostMode::Interactive);
    }
    if !args.stylelint_reports.is_empty() {
        config.set_stylelint_report_paths(args.stylelint_reports.clone());
    }
}

fn bridge_for(config: &StylebridgeConfig) -> BridgeServer {
    let bridge = config.bridge();
    let bundle = InstalledBundle::new(BUNDLE_NAME, bridge.bundle_dir(), bridge.entry_point());
    let settings = BridgeSettings::default()
        .with_timeout(bridge.timeout())
        .with_max_old_space_size(bridge.max_old_space_size())
        .with_runtime(bridge.runtime().map(str::to_string))
        .with_runtime_version_check(bridge.check_runtime_version());
    BridgeServer::new(bundle, settings)
}

fn sensor_settings(config: &StylebridgeConfig) -> SensorSettings {
    let analysis = config.analysis();
    SensorSettings::default()
        .with_fail_fast(config.bridge().fail_fast())
        .with_content_policy(analysis.content_policy())
        .with_mode(analysis.mode())
        .with_progress_interval(analysis.progress_interval())
}

fn exit_status(summary: &AnalysisSummary, imported: usize) -> u8 {
    match summary.status {
        RunStatus::Degraded => 2,
        _ if summary.issues_saved + imported > 0 => 1,
        _ => 0,
    }
}

/// Cancel `signal` on the first Ctrl-C.
fn cancel_on_ctrl_c(signal: CancelSignal) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::debug!("Ctrl-C handler unavailable: {e}");
            return;
        }
        tracing::info!("Interrupted, cancelling analysis");
        signal.cancel();
    })
}

async fn run(args: Args) -> Result<ExitCode> {
    let project = args.project_dir.canonicalize().with_context(|| {
        format!(
            "project directory {} is not accessible",
            args.project_dir.display()
        )
    })?;

    let loaded = stylebridge_config::load(args.config.as_deref(), &project)?;
    if let Some(source) = loaded.source() {
        tracing::debug!(path = %source.display(), "Loaded configuration");
    }
    let mut config = loaded.into_config();
    apply_args(&mut config, &args);

    let active = if config.rules().is_empty() {
        default_active_rules()
    } else {
        config.rules().to_vec()
    };
    let rules = CssRules::new(&active).context("invalid rule parameters")?;

    let work_dir = project.join(WORK_DIR_NAME);
    std::fs::create_dir_all(&work_dir)
        .with_context(|| format!("failed to create work dir {}", work_dir.display()))?;
    let files = LocalFileSystem::scan(&project, work_dir, config.analysis().file_suffixes());

    let mut imported: Vec<ExternalIssue> = Vec::new();
    let reports = config.analysis().stylelint_report_paths();
    if !reports.is_empty() {
        let summary = ExternalReportImporter::new(&rules, &project, files.files())
            .import(reports, &mut imported);
        tracing::debug!(?summary, "Imported stylelint reports");
    }

    let bridge = Arc::new(bridge_for(&config));
    let sensor = RuleSensor::new(
        Arc::clone(&bridge),
        rules,
        sensor_settings(&config),
        AnalysisWarnings::new(),
    );

    let cancel = CancelSignal::new();
    let ctrl_c = cancel_on_ctrl_c(cancel.clone());
    let mut issues: Vec<Issue> = Vec::new();
    let result = sensor.execute(&files, &mut issues, &cancel).await;
    ctrl_c.abort();
    bridge.stop().await;

    for warning in sensor.warnings().messages() {
        tracing::warn!("{warning}");
    }
    let summary = result.context("CSS analysis failed")?;
    tracing::debug!(?summary, "Analysis finished");

    report_issues(args.format, &project, &issues, &imported)?;
    Ok(ExitCode::from(exit_status(&summary, imported.len())))
}

fn report_issues(
    format: OutputFormat,
    project: &Path,
    issues: &[Issue],
    imported: &[ExternalIssue],
) -> Result<()> {
    let stdout = io::stdout();
    write_issues(&mut stdout.lock(), format, project, issues, imported)
        .context("failed to write report")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(2)
        }
    }
}
