//! Resolved configuration types.
//!
//! Raw TOML structs (all `Option`s) stay private here. They are resolved into
//! the public types at the deserialization boundary via `#[serde(try_from)]`,
//! so holding a [`StylebridgeConfig`] is proof that every value is valid.

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use stylebridge_types::{ActiveRule, ContentPolicy, HostMode};

use crate::{default_bundle_dir, expand_path};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PROGRESS_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_RUNTIME: &str = "node";
pub const DEFAULT_ENTRY_POINT: &str = "bin/server";
pub const DEFAULT_FILE_SUFFIXES: &[&str] = &["css", "less", "scss"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("bridge.timeout_secs must be greater than zero")]
    ZeroTimeout,
    #[error("bridge.max_old_space_size must be greater than zero")]
    ZeroMemoryHint,
    #[error("bridge.entry_point must not be empty")]
    EmptyEntryPoint,
    #[error("analysis.file_suffixes must name at least one suffix")]
    NoSuffixes,
    #[error("analysis.progress_interval_secs must be greater than zero")]
    ZeroProgressInterval,
    #[error("rules.{rule}.{param}: nested tables are not valid rule parameters")]
    NestedRuleParam { rule: String, param: String },
}

#[derive(Debug, Default, Deserialize)]
struct RawBridgeConfig {
    timeout_secs: Option<u64>,
    max_old_space_size: Option<u32>,
    runtime: Option<String>,
    check_runtime_version: Option<bool>,
    bundle_dir: Option<String>,
    entry_point: Option<String>,
    #[serde(default)]
    fail_fast: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawAnalysisConfig {
    file_suffixes: Option<Vec<String>>,
    send_file_content: Option<ContentPolicy>,
    mode: Option<HostMode>,
    progress_interval_secs: Option<u64>,
    #[serde(default)]
    stylelint_report_paths: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawConfig {
    #[serde(default)]
    bridge: RawBridgeConfig,
    #[serde(default)]
    analysis: RawAnalysisConfig,
    #[serde(default)]
    rules: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

/// How the worker is started and supervised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    timeout: Duration,
    max_old_space_size: Option<NonZeroU32>,
    runtime: Option<String>,
    check_runtime_version: bool,
    bundle_dir: PathBuf,
    entry_point: PathBuf,
    fail_fast: bool,
}

impl BridgeConfig {
    /// Startup timeout, also applied to each request.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn max_old_space_size(&self) -> Option<NonZeroU32> {
        self.max_old_space_size
    }

    /// Interpreter used to run the entry point. `None` runs the entry point directly.
    #[must_use]
    pub fn runtime(&self) -> Option<&str> {
        self.runtime.as_deref()
    }

    #[must_use]
    pub fn check_runtime_version(&self) -> bool {
        self.check_runtime_version
    }

    #[must_use]
    pub fn bundle_dir(&self) -> &PathBuf {
        &self.bundle_dir
    }

    /// Entry point, relative to [`Self::bundle_dir`] unless absolute.
    #[must_use]
    pub fn entry_point(&self) -> &PathBuf {
        &self.entry_point
    }

    #[must_use]
    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_old_space_size: None,
            runtime: Some(DEFAULT_RUNTIME.to_string()),
            check_runtime_version: true,
            bundle_dir: default_bundle_dir(),
            entry_point: PathBuf::from(DEFAULT_ENTRY_POINT),
            fail_fast: false,
        }
    }
}

impl TryFrom<RawBridgeConfig> for BridgeConfig {
    type Error = SettingsError;

    fn try_from(raw: RawBridgeConfig) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        let timeout = match raw.timeout_secs {
            Some(0) => return Err(SettingsError::ZeroTimeout),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.timeout,
        };
        let max_old_space_size = match raw.max_old_space_size {
            Some(mb) => Some(NonZeroU32::new(mb).ok_or(SettingsError::ZeroMemoryHint)?),
            None => None,
        };
        // An explicitly empty runtime means "execute the entry point itself".
        let runtime = match raw.runtime {
            Some(runtime) if runtime.trim().is_empty() => None,
            Some(runtime) => Some(runtime.trim().to_string()),
            None => defaults.runtime,
        };
        let entry_point = match raw.entry_point {
            Some(entry) if entry.trim().is_empty() => return Err(SettingsError::EmptyEntryPoint),
            Some(entry) => expand_path(entry.trim()),
            None => defaults.entry_point,
        };
        Ok(Self {
            timeout,
            max_old_space_size,
            runtime,
            check_runtime_version: raw
                .check_runtime_version
                .unwrap_or(defaults.check_runtime_version),
            bundle_dir: raw
                .bundle_dir
                .map(|dir| expand_path(&dir))
                .unwrap_or(defaults.bundle_dir),
            entry_point,
            fail_fast: raw.fail_fast,
        })
    }
}

/// Which files are analyzed, and how requests are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    file_suffixes: Vec<String>,
    content_policy: ContentPolicy,
    mode: HostMode,
    progress_interval: Duration,
    stylelint_report_paths: Vec<PathBuf>,
}

impl AnalysisConfig {
    /// Suffixes without the leading dot, lowercased.
    #[must_use]
    pub fn file_suffixes(&self) -> &[String] {
        &self.file_suffixes
    }

    #[must_use]
    pub fn content_policy(&self) -> ContentPolicy {
        self.content_policy
    }

    #[must_use]
    pub fn mode(&self) -> HostMode {
        self.mode
    }

    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        self.progress_interval
    }

    /// Existing stylelint JSON reports to import. Relative paths resolve
    /// against the project directory.
    #[must_use]
    pub fn stylelint_report_paths(&self) -> &[PathBuf] {
        &self.stylelint_report_paths
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            file_suffixes: DEFAULT_FILE_SUFFIXES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            content_policy: ContentPolicy::default(),
            mode: HostMode::default(),
            progress_interval: Duration::from_secs(DEFAULT_PROGRESS_INTERVAL_SECS),
            stylelint_report_paths: Vec::new(),
        }
    }
}

impl TryFrom<RawAnalysisConfig> for AnalysisConfig {
    type Error = SettingsError;

    fn try_from(raw: RawAnalysisConfig) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        let file_suffixes = match raw.file_suffixes {
            Some(suffixes) => {
                let normalized: Vec<String> = suffixes
                    .iter()
                    .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect();
                if normalized.is_empty() {
                    return Err(SettingsError::NoSuffixes);
                }
                normalized
            }
            None => defaults.file_suffixes,
        };
        let progress_interval = match raw.progress_interval_secs {
            Some(0) => return Err(SettingsError::ZeroProgressInterval),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.progress_interval,
        };
        Ok(Self {
            file_suffixes,
            content_policy: raw.send_file_content.unwrap_or(defaults.content_policy),
            mode: raw.mode.unwrap_or(defaults.mode),
            progress_interval,
            stylelint_report_paths: raw
                .stylelint_report_paths
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(expand_path)
                .collect(),
        })
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct StylebridgeConfig {
    bridge: BridgeConfig,
    analysis: AnalysisConfig,
    rules: Vec<ActiveRule>,
}

impl StylebridgeConfig {
    #[must_use]
    pub fn bridge(&self) -> &BridgeConfig {
        &self.bridge
    }

    #[must_use]
    pub fn analysis(&self) -> &AnalysisConfig {
        &self.analysis
    }

    /// Rules named in the file. Empty means "use the analyzer's defaults".
    #[must_use]
    pub fn rules(&self) -> &[ActiveRule] {
        &self.rules
    }

    pub fn set_fail_fast(&mut self, fail_fast: bool) {
        self.bridge.fail_fast = fail_fast;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        if !timeout.is_zero() {
            self.bridge.timeout = timeout;
        }
    }

    pub fn set_bundle_dir(&mut self, dir: PathBuf) {
        self.bridge.bundle_dir = dir;
    }

    pub fn set_mode(&mut self, mode: HostMode) {
        self.analysis.mode = mode;
    }

    /// Replace the configured report list.
    pub fn set_stylelint_report_paths(&mut self, paths: Vec<PathBuf>) {
        self.analysis.stylelint_report_paths = paths;
    }
}

impl TryFrom<RawConfig> for StylebridgeConfig {
    type Error = SettingsError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let mut rules = Vec::with_capacity(raw.rules.len());
        for (key, params) in raw.rules {
            let mut rule = ActiveRule::new(key.trim());
            for (name, value) in params {
                let Some(value) = param_to_string(&value) else {
                    return Err(SettingsError::NestedRuleParam {
                        rule: key.clone(),
                        param: name,
                    });
                };
                rule = rule.with_param(name, value);
            }
            rules.push(rule);
        }
        Ok(Self {
            bridge: raw.bridge.try_into()?,
            analysis: raw.analysis.try_into()?,
            rules,
        })
    }
}

/// Profiles store every parameter as a string; arrays become comma lists.
fn param_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(dt) => Some(dt.to_string()),
        toml::Value::Array(items) => items
            .iter()
            .map(param_to_string)
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(",")),
        toml::Value::Table(_) => None,
    }
}
