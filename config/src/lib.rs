//! Configuration loading for stylebridge.
//!
//! Lookup order, first hit wins:
//!
//! 1. an explicit path (`--config`), which must exist
//! 2. `<project>/.stylebridge.toml`
//! 3. `~/.stylebridge/config.toml`
//! 4. built-in defaults
//!
//! Environment overrides are applied on top of whichever source was used.

mod settings;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use settings::{
    AnalysisConfig, BridgeConfig, DEFAULT_ENTRY_POINT, DEFAULT_FILE_SUFFIXES,
    DEFAULT_PROGRESS_INTERVAL_SECS, DEFAULT_RUNTIME, DEFAULT_TIMEOUT_SECS, SettingsError,
    StylebridgeConfig,
};

pub const PROJECT_CONFIG_FILE: &str = ".stylebridge.toml";
pub const FAIL_FAST_ENV: &str = "STYLEBRIDGE_FAIL_FAST";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

/// A resolved configuration plus the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    config: StylebridgeConfig,
    source: Option<PathBuf>,
}

impl LoadedConfig {
    #[must_use]
    pub fn config(&self) -> &StylebridgeConfig {
        &self.config
    }

    #[must_use]
    pub fn into_config(self) -> StylebridgeConfig {
        self.config
    }

    /// `None` when built-in defaults were used.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

pub fn load(explicit: Option<&Path>, project_dir: &Path) -> Result<LoadedConfig, ConfigError> {
    let mut loaded = match explicit {
        Some(path) => LoadedConfig {
            config: load_file(path)?,
            source: Some(path.to_path_buf()),
        },
        None => {
            let candidates = [Some(project_dir.join(PROJECT_CONFIG_FILE)), config_path()];
            match candidates.into_iter().flatten().find(|p| p.is_file()) {
                Some(path) => LoadedConfig {
                    config: load_file(&path)?,
                    source: Some(path),
                },
                None => {
                    tracing::debug!("No configuration file found, using defaults");
                    LoadedConfig {
                        config: StylebridgeConfig::default(),
                        source: None,
                    }
                }
            }
        }
    };

    apply_env_overrides(&mut loaded.config, |key| env::var(key).ok());
    Ok(loaded)
}

pub fn load_file(path: &Path) -> Result<StylebridgeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| {
        tracing::warn!("Failed to read config at {}: {source}", path.display());
        ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }
    })?;

    toml::from_str(&content).map_err(|source| {
        tracing::warn!("Failed to parse config at {}: {source}", path.display());
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Apply environment overrides through `lookup`, so tests need not touch the
/// process environment.
pub fn apply_env_overrides(config: &mut StylebridgeConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(raw) = lookup(FAIL_FAST_ENV) {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => config.set_fail_fast(true),
            "0" | "false" | "no" => config.set_fail_fast(false),
            other => tracing::warn!("Ignoring {FAIL_FAST_ENV}={other}: expected true or false"),
        }
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".stylebridge").join("config.toml"))
}

pub(crate) fn default_bundle_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".stylebridge").join("css-bundle"))
        .unwrap_or_else(|| PathBuf::from("css-bundle"))
}

/// Expand `${VAR}` references and a leading `~/`.
pub(crate) fn expand_path(raw: &str) -> PathBuf {
    let expanded = expand_env_vars(raw);
    if let Some(rest) = expanded.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(expanded)
}

/// Replace `${VAR}` with the variable's value; unset variables become empty.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use stylebridge_types::{ContentPolicy, HostMode};

    use super::*;

    fn parse(toml: &str) -> Result<StylebridgeConfig, toml::de::Error> {
        toml::from_str(toml)
    }

    // ── defaults ────────────────────────────────────────────────────────

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.bridge().timeout(), Duration::from_secs(60));
        assert_eq!(config.bridge().runtime(), Some("node"));
        assert!(config.bridge().check_runtime_version());
        assert!(!config.bridge().fail_fast());
        assert_eq!(config.bridge().max_old_space_size(), None);
        assert_eq!(config.analysis().file_suffixes(), ["css", "less", "scss"]);
        assert_eq!(
            config.analysis().content_policy(),
            ContentPolicy::WhenUntrusted
        );
        assert_eq!(config.analysis().mode(), HostMode::Batch);
        assert_eq!(config.analysis().progress_interval(), Duration::from_secs(10));
        assert!(config.rules().is_empty());
        assert!(config.analysis().stylelint_report_paths().is_empty());
    }

    // ── bridge section ──────────────────────────────────────────────────

    #[test]
    fn bridge_section_parses() {
        let config = parse(
            r#"
            [bridge]
            timeout_secs = 5
            max_old_space_size = 2048
            runtime = "/opt/node/bin/node"
            check_runtime_version = false
            bundle_dir = "/srv/bundle"
            entry_point = "dist/server.js"
            fail_fast = true
            "#,
        )
        .unwrap();
        let bridge = config.bridge();
        assert_eq!(bridge.timeout(), Duration::from_secs(5));
        assert_eq!(bridge.max_old_space_size().map(|n| n.get()), Some(2048));
        assert_eq!(bridge.runtime(), Some("/opt/node/bin/node"));
        assert!(!bridge.check_runtime_version());
        assert_eq!(bridge.bundle_dir(), &PathBuf::from("/srv/bundle"));
        assert_eq!(bridge.entry_point(), &PathBuf::from("dist/server.js"));
        assert!(bridge.fail_fast());
    }

    #[test]
    fn empty_runtime_runs_entry_point_directly() {
        let config = parse("[bridge]\nruntime = \"\"").unwrap();
        assert_eq!(config.bridge().runtime(), None);
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = parse("[bridge]\ntimeout_secs = 0").unwrap_err();
        assert!(err.to_string().contains("timeout_secs"), "{err}");
    }

    #[test]
    fn zero_memory_hint_rejected() {
        let err = parse("[bridge]\nmax_old_space_size = 0").unwrap_err();
        assert!(err.to_string().contains("max_old_space_size"), "{err}");
    }

    // ── analysis section ────────────────────────────────────────────────

    #[test]
    fn suffixes_are_normalized() {
        let config = parse("[analysis]\nfile_suffixes = [\".CSS\", \" scss \"]").unwrap();
        assert_eq!(config.analysis().file_suffixes(), ["css", "scss"]);
    }

    #[test]
    fn empty_suffix_list_rejected() {
        let err = parse("[analysis]\nfile_suffixes = []").unwrap_err();
        assert!(err.to_string().contains("file_suffixes"), "{err}");
    }

    #[test]
    fn content_policy_and_mode_parse() {
        let config = parse(
            "[analysis]\nsend_file_content = \"always\"\nmode = \"interactive\"",
        )
        .unwrap();
        assert_eq!(config.analysis().content_policy(), ContentPolicy::Always);
        assert_eq!(config.analysis().mode(), HostMode::Interactive);
    }

    #[test]
    fn stylelint_reports_are_listed() {
        let config = parse(
            "[analysis]\nstylelint_report_paths = [\"reports/stylelint.json\", \" \", \"/tmp/b.json\"]",
        )
        .unwrap();
        assert_eq!(
            config.analysis().stylelint_report_paths(),
            [
                PathBuf::from("reports/stylelint.json"),
                PathBuf::from("/tmp/b.json")
            ]
        );
    }

    #[test]
    fn unknown_content_policy_rejected() {
        assert!(parse("[analysis]\nsend_file_content = \"sometimes\"").is_err());
    }

    // ── rules ───────────────────────────────────────────────────────────

    #[test]
    fn rules_keep_params_as_strings() {
        let config = parse(
            r#"
            [rules.S4647]
            [rules.S4656]
            ignoreFallbacks = false
            [rules.S4662]
            ignoreAtRules = ["include", "mixin"]
            "#,
        )
        .unwrap();
        let rules = config.rules();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].key(), "S4647");
        assert_eq!(rules[1].param("ignoreFallbacks"), Some("false"));
        assert_eq!(rules[2].param("ignoreAtRules"), Some("include,mixin"));
    }

    #[test]
    fn nested_rule_param_rejected() {
        let err = parse("[rules.S4662.ignoreAtRules]\nfoo = 1").unwrap_err();
        assert!(err.to_string().contains("nested tables"), "{err}");
    }

    // ── loading ─────────────────────────────────────────────────────────

    #[test]
    fn project_file_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[bridge]\ntimeout_secs = 7",
        )
        .unwrap();

        let loaded = load(None, dir.path()).unwrap();
        assert_eq!(loaded.config().bridge().timeout(), Duration::from_secs(7));
        assert_eq!(
            loaded.source(),
            Some(dir.path().join(PROJECT_CONFIG_FILE).as_path())
        );
    }

    #[test]
    fn explicit_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.path(), missing.as_path());
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[bridge\ntimeout_secs = ").unwrap();
        assert!(matches!(
            load_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    // ── environment ─────────────────────────────────────────────────────

    #[test]
    fn fail_fast_env_override() {
        let mut config = StylebridgeConfig::default();
        apply_env_overrides(&mut config, |key| {
            (key == FAIL_FAST_ENV).then(|| "true".to_string())
        });
        assert!(config.bridge().fail_fast());

        apply_env_overrides(&mut config, |_| Some("0".to_string()));
        assert!(!config.bridge().fail_fast());
    }

    #[test]
    fn fail_fast_env_garbage_ignored() {
        let mut config = StylebridgeConfig::default();
        config.set_fail_fast(true);
        apply_env_overrides(&mut config, |_| Some("perhaps".to_string()));
        assert!(config.bridge().fail_fast());
    }

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("hello world"), "hello world");
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        assert_eq!(
            expand_env_vars("before ${STYLEBRIDGE_SURELY_UNSET_VAR} after"),
            "before  after"
        );
    }

    #[test]
    fn expand_env_vars_unterminated_kept_verbatim() {
        assert_eq!(expand_env_vars("a ${OOPS"), "a ${OOPS");
    }

    #[test]
    fn expand_env_vars_reads_path() {
        let path = env::var("PATH").unwrap_or_default();
        assert_eq!(expand_env_vars("${PATH}:/x"), format!("{path}:/x"));
    }
}
