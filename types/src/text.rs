//! Small pure text helpers.

/// Truncate `raw` to at most `max_chars` characters of content, appending a
/// marker that says how much was cut.
///
/// Used to keep worker payloads readable when they end up in error messages.
/// Counts `char`s, never splits a Unicode scalar value.
#[must_use]
pub fn truncate_payload(raw: &str, max_chars: usize) -> String {
    let total = raw.chars().count();
    if total <= max_chars {
        return raw.to_string();
    }
    let head: String = raw.chars().take(max_chars).collect();
    format!("{head}... ({} more characters)", total - max_chars)
}

#[cfg(test)]
mod tests {
    use super::truncate_payload;

    #[test]
    fn payload_under_limit_unchanged() {
        assert_eq!(truncate_payload("[]", 10), "[]");
    }

    #[test]
    fn payload_reports_cut_length() {
        assert_eq!(
            truncate_payload("<html>oops</html>", 6),
            "<html>... (11 more characters)"
        );
    }

    #[test]
    fn payload_counts_chars_not_bytes() {
        assert_eq!(truncate_payload("ééé", 2), "éé... (1 more characters)");
    }
}
