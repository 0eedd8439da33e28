//! Rule catalog and the stylelint configuration document built from it.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use stylebridge_types::{ActiveRule, RuleKey, RuleParamError};
use thiserror::Error;

/// Repository the host files CSS rules under.
pub const REPOSITORY_KEY: &str = "css";

/// Name of the configuration document inside the work directory.
pub const CONFIG_FILE_NAME: &str = "stylelintconfig.json";

const DEFAULT_IGNORED_AT_RULES: &str =
    "at-root,content,debug,each,else,error,for,function,if,include,mixin,return,warn,while,extend";
const DEFAULT_IGNORED_PROPERTIES: &str = "composes, exportedKey, localAlias, /^mso-/";
const DEFAULT_IGNORED_TYPES: &str = "/^mat-/";

/// Extra options a catalog rule carries into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleOptions {
    None,
    /// Comma-separated parameter rendered as a string list under the same name.
    List {
        param: &'static str,
        default: &'static str,
    },
    IgnoreFallbacks,
    IgnorePseudoClasses,
}

struct CatalogEntry {
    key: &'static str,
    stylelint: &'static str,
    options: RuleOptions,
}

const fn entry(key: &'static str, stylelint: &'static str) -> CatalogEntry {
    CatalogEntry {
        key,
        stylelint,
        options: RuleOptions::None,
    }
}

const fn with_list(
    key: &'static str,
    stylelint: &'static str,
    param: &'static str,
    default: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        key,
        stylelint,
        options: RuleOptions::List { param, default },
    }
}

const CATALOG: &[CatalogEntry] = &[
    entry("S4647", "color-no-invalid-hex"),
    entry("S4648", "font-family-no-duplicate-names"),
    entry("S4649", "font-family-no-missing-generic-family-keyword"),
    entry("S4650", "function-calc-no-unspaced-operator"),
    entry("S4651", "function-linear-gradient-no-nonstandard-direction"),
    entry("S4652", "string-no-newline"),
    entry("S4653", "unit-no-unknown"),
    with_list(
        "S4654",
        "property-no-unknown",
        "ignoreProperties",
        DEFAULT_IGNORED_PROPERTIES,
    ),
    entry("S4655", "keyframe-declaration-no-important"),
    CatalogEntry {
        key: "S4656",
        stylelint: "declaration-block-no-duplicate-properties",
        options: RuleOptions::IgnoreFallbacks,
    },
    entry("S4657", "declaration-block-no-shorthand-property-overrides"),
    entry("S4658", "block-no-empty"),
    CatalogEntry {
        key: "S4659",
        stylelint: "selector-pseudo-class-no-unknown",
        options: RuleOptions::IgnorePseudoClasses,
    },
    entry("S4660", "selector-pseudo-element-no-unknown"),
    entry("S4661", "media-feature-name-no-unknown"),
    with_list(
        "S4662",
        "at-rule-no-unknown",
        "ignoreAtRules",
        DEFAULT_IGNORED_AT_RULES,
    ),
    entry("S4663", "comment-no-empty"),
    entry("S4664", "no-descending-specificity"),
    entry("S4666", "no-duplicate-selectors"),
    entry("S4667", "no-empty-source"),
    entry("S4668", "no-extra-semicolons"),
    with_list(
        "S4670",
        "selector-type-no-unknown",
        "ignoreTypes",
        DEFAULT_IGNORED_TYPES,
    ),
];

/// Host keys of every catalog rule, in catalog order.
pub fn catalog_keys() -> impl Iterator<Item = &'static str> {
    CATALOG.iter().map(|entry| entry.key)
}

/// Every catalog rule with default parameters.
#[must_use]
pub fn default_active_rules() -> Vec<ActiveRule> {
    catalog_keys().map(ActiveRule::new).collect()
}

#[derive(Debug, Error)]
pub enum RulesError {
    #[error(transparent)]
    Param(#[from] RuleParamError),

    #[error("failed to write rule configuration to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn render(entry: &CatalogEntry, rule: &ActiveRule) -> Result<Value, RuleParamError> {
    Ok(match entry.options {
        RuleOptions::None => Value::Bool(true),
        RuleOptions::List { param, default } => {
            let items = split_list(rule.param(param).unwrap_or(default));
            json!([true, { param: items }])
        }
        RuleOptions::IgnoreFallbacks => {
            if rule.bool_param("ignoreFallbacks", true)? {
                json!([true, { "ignore": ["consecutive-duplicates-with-different-values"] }])
            } else {
                Value::Bool(true)
            }
        }
        RuleOptions::IgnorePseudoClasses => {
            json!([true, { "ignorePseudoClasses": ["local", "global"] }])
        }
    })
}

/// Active rules resolved against the catalog.
///
/// Maps stylelint keys back to host rule keys, and renders the document the
/// worker reads through `configFile`.
#[derive(Debug, Clone, Default)]
pub struct CssRules {
    keys: BTreeMap<&'static str, RuleKey>,
    config: BTreeMap<&'static str, Value>,
}

impl CssRules {
    pub fn new(active: &[ActiveRule]) -> Result<Self, RulesError> {
        let mut rules = Self::default();
        for rule in active {
            let Some(entry) = CATALOG.iter().find(|entry| entry.key == rule.key()) else {
                tracing::warn!(rule = rule.key(), "Ignoring rule unknown to the CSS catalog");
                continue;
            };
            rules.config.insert(entry.stylelint, render(entry, rule)?);
            rules
                .keys
                .insert(entry.stylelint, RuleKey::new(REPOSITORY_KEY, entry.key));
        }
        Ok(rules)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Host rule for a stylelint key, if that rule is active.
    #[must_use]
    pub fn active_rule_key(&self, stylelint_key: &str) -> Option<&RuleKey> {
        self.keys.get(stylelint_key)
    }

    /// `{"rules": {...}}` with keys in sorted order.
    #[must_use]
    pub fn config_document(&self) -> Value {
        let rules: serde_json::Map<String, Value> = self
            .config
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect();
        json!({ "rules": rules })
    }

    /// Write the document to `<work_dir>/stylelintconfig.json` and return its path.
    pub fn write_config(&self, work_dir: &Path) -> Result<PathBuf, RulesError> {
        let path = work_dir.join(CONFIG_FILE_NAME);
        let mut bytes = self.config_document().to_string().into_bytes();
        bytes.push(b'\n');
        stylebridge_utils::atomic_write(&path, &bytes).map_err(|source| RulesError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), rules = self.len(), "Wrote rule configuration");
        Ok(path)
    }
}
