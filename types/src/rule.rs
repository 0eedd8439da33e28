//! Rules enabled by the host's quality profile.

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleParamError {
    #[error("rule {rule}: parameter '{param}' must be true or false, got '{value}'")]
    NotABoolean {
        rule: String,
        param: String,
        value: String,
    },
}

/// A host rule key plus its string-typed parameters, as a profile stores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRule {
    key: String,
    params: BTreeMap<String, String>,
}

impl ActiveRule {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            params: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn bool_param(&self, name: &str, default: bool) -> Result<bool, RuleParamError> {
        let Some(raw) = self.param(name) else {
            return Ok(default);
        };
        match raw.trim() {
            v if v.eq_ignore_ascii_case("true") => Ok(true),
            v if v.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(RuleParamError::NotABoolean {
                rule: self.key.clone(),
                param: name.to_string(),
                value: raw.to_string(),
            }),
        }
    }
}
