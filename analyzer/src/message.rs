use std::sync::LazyLock;

use regex::Regex;

/// stylelint messages end in `(rule-name)`.
static RULE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(.+?)\s*\([a-z-]+\)\s*$").expect("rule suffix regex is valid")
});

/// Strip the trailing `(rule-name)` from a worker message.
#[must_use]
pub fn normalize_message(text: &str) -> String {
    match RULE_SUFFIX.captures(text) {
        Some(captures) => captures[1].to_string(),
        None => text.to_string(),
    }
}
