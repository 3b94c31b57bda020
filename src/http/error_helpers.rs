//! Error context formatting for diagnostics.

/// Maximum characters to include from a response body in parse error messages
pub(crate) const BODY_PREVIEW_LENGTH: usize = 200;

/// Formats a JSON parsing failure with a preview of the offending body.
///
/// # Arguments
///
/// * `body` - The text that failed to parse
/// * `error` - The original serde_json error
///
/// # Returns
///
/// A formatted message with a body preview (first 200 chars)
pub(crate) fn format_json_parse_error(body: &str, error: &serde_json::Error) -> String {
    let preview = truncate_for_context(body, BODY_PREVIEW_LENGTH);
    format!("JSON parse error: {} | Context: {}", error, preview)
}

/// Truncates a string to specified length, adding "..." if truncated.
///
/// Uses character-boundary-aware slicing to prevent panics on multi-byte UTF-8 characters.
pub(crate) fn truncate_for_context(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        // The character END position must be <= max_len
        let truncate_at = s
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &s[..truncate_at])
    }
}
