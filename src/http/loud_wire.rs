//! Wire-level debugging via LOUD_WIRE environment variable.
//!
//! When `LOUD_WIRE` is set to any value, prints raw JSON of analysis requests
//! and responses to stderr with pretty formatting and colors.
//!
//! # Usage
//!
//! ```bash
//! LOUD_WIRE=1 debugmate --file main.c "What is the flow of count?"
//! ```
//!
//! # Output Format
//!
//! - Green `>>>` for outgoing requests
//! - Red `<<<` for incoming responses
//! - Timestamps and request IDs for correlation
//!
//! URLs are logged with the `key=` parameter redacted, and the API key header
//! is never printed. Very long `text` values (whole source files) are cut.

use colored::Colorize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::common::redact_api_key;
use super::error_helpers::truncate_for_context;

/// Request ID counter for correlating requests with responses
static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Cached check for whether LOUD_WIRE is enabled
static ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if LOUD_WIRE debugging is enabled.
///
/// The result is cached after first check, so `LOUD_WIRE` must be set before
/// the first request is sent.
#[must_use]
pub fn is_enabled() -> bool {
    *ENABLED.get_or_init(|| std::env::var("LOUD_WIRE").is_ok())
}

/// Get the next request ID for correlation.
#[must_use]
pub fn next_request_id() -> usize {
    REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Fields whose string values are cut when too long.
const TRUNCATE_FIELDS: &[&str] = &["text"];

/// Maximum length of a truncated field before the "..." marker.
const TRUNCATE_THRESHOLD: usize = 2000;

/// Maximum length of a non-JSON body printed as-is.
const RAW_BODY_THRESHOLD: usize = 1000;

/// Truncate long `text` fields in a JSON value, recursively.
fn truncate_long_fields(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if TRUNCATE_FIELDS.contains(&key.as_str()) {
                    if let serde_json::Value::String(s) = val
                        && s.len() > TRUNCATE_THRESHOLD
                    {
                        *s = truncate_for_context(s, TRUNCATE_THRESHOLD);
                    }
                } else {
                    truncate_long_fields(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                truncate_long_fields(item);
            }
        }
        _ => {}
    }
}

/// Format the current UTC timestamp for log output.
fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

/// Log prefix with timestamp and request ID.
fn prefix(request_id: usize) -> String {
    format!(
        "{} {} {}",
        "[LOUD_WIRE]".bold(),
        timestamp().dimmed(),
        format!("[REQ#{}]", request_id).cyan()
    )
}

/// Prints a body as colored JSON when possible, otherwise as truncated text.
fn print_body(prefix: &str, label: &str, body: &[u8]) {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(mut parsed) => {
            truncate_long_fields(&mut parsed);
            eprintln!("{prefix} {label}:");
            if let Ok(colored) = colored_json::to_colored_json_auto(&parsed) {
                for line in colored.lines() {
                    eprintln!("{prefix} {line}");
                }
            } else if let Ok(pretty) = serde_json::to_string_pretty(&parsed) {
                for line in pretty.lines() {
                    eprintln!("{prefix} {line}");
                }
            }
        }
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let truncated = truncate_for_context(&text, RAW_BODY_THRESHOLD);
            eprintln!("{prefix} {label}: {truncated}");
        }
    }
}

/// Log an outgoing HTTP request.
pub fn log_request(request_id: usize, method: &str, url: &str, body: &[u8]) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    let direction = ">>>".green().bold();

    eprintln!("{prefix} {direction} {method} {}", redact_api_key(url));
    print_body(&prefix, &"Body".green().to_string(), body);
}

/// Log an incoming HTTP response status.
pub fn log_response_status(request_id: usize, status: u16) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    let direction = "<<<".red().bold();
    let status_text = if status < 300 {
        format!("{status} OK").green()
    } else {
        format!("{status} ERROR").red()
    };

    eprintln!("{prefix} {direction} {status_text}");
}

/// Log an incoming HTTP response body.
pub fn log_response_body(request_id: usize, body: &[u8]) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    print_body(&prefix, &"Response".red().to_string(), body);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text() {
        let mut value = serde_json::json!({"text": "int x = 0;"});
        truncate_long_fields(&mut value);
        assert_eq!(value["text"], "int x = 0;");
    }

    #[test]
    fn test_truncate_long_text_nested() {
        let source = "int x = 0;\n".repeat(500);
        let mut value = serde_json::json!({
            "contents": [{"parts": [{"text": source}]}],
            "generationConfig": {"temperature": 0.3}
        });
        truncate_long_fields(&mut value);

        let text = value["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.ends_with("..."));
        assert_eq!(text.len(), TRUNCATE_THRESHOLD + 3);
        assert_eq!(value["generationConfig"]["temperature"], 0.3);
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp();
        // ISO 8601: YYYY-MM-DDTHH:MM:SSZ
        assert_eq!(ts.len(), 20, "Timestamp should be 20 chars: {ts}");
        assert!(ts.ends_with('Z'));
        assert!(ts.contains('T'));
    }

    #[test]
    fn test_request_id_increments() {
        let id1 = next_request_id();
        let id2 = next_request_id();
        assert!(id2 > id1, "Request IDs should increment");
    }
}
