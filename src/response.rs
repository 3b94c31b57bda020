//! Response interpretation: status + body → answer and usage.
//!
//! The body is read as a generic JSON value and walked with explicit
//! optional lookups. Only a non-200 status or an unparseable body is an
//! error; every missing or mistyped field below the root degrades to an
//! absent value instead.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::errors::AnalysisError;
use crate::http::error_helpers::format_json_parse_error;

/// Token usage reported by the service.
///
/// Each counter is independent: a counter the service omitted (or sent as
/// something other than a non-negative integer) is `None`, never zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    /// Tokens in the request (`promptTokenCount`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    /// Tokens in the generated answer (`candidatesTokenCount`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_tokens: Option<u64>,
    /// Total billed tokens (`totalTokenCount`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl UsageStats {
    /// Returns true if any counter is present
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.prompt_tokens.is_some() || self.response_tokens.is_some() || self.total_tokens.is_some()
    }
}

/// A successful analysis.
///
/// `answer` is empty when the service returned no usable candidate, e.g.
/// because the output was filtered. Check [`finish_reason`](Self::finish_reason)
/// to tell why.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisResponse {
    /// Text of the first part of the first candidate, or `""`
    pub answer: String,
    /// Usage counters, `None` when the response carried no `usageMetadata`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageStats>,
    /// `finishReason` of the first candidate (e.g. `STOP`, `SAFETY`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    /// Model version that served the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl AnalysisResponse {
    /// Returns true if the service produced answer text
    #[must_use]
    pub fn has_answer(&self) -> bool {
        !self.answer.is_empty()
    }
}

/// Reads a token counter, accepting only non-negative integers.
fn token_count(usage: &Value, field: &str) -> Option<u64> {
    let raw = usage.get(field)?;
    if let Some(count) = raw.as_u64() {
        return Some(count);
    }
    if raw.as_i64().is_some_and(|v| v < 0) {
        warn!("Ignoring negative token count {field}={raw}");
    } else {
        warn!("Ignoring non-integer token count {field}={raw}");
    }
    None
}

fn extract_usage(root: &Value) -> Option<UsageStats> {
    let usage = root.get("usageMetadata").filter(|v| v.is_object())?;
    Some(UsageStats {
        prompt_tokens: token_count(usage, "promptTokenCount"),
        response_tokens: token_count(usage, "candidatesTokenCount"),
        total_tokens: token_count(usage, "totalTokenCount"),
    })
}

/// `candidates[0].content.parts[0].text`, with every link optional.
fn extract_answer(first_candidate: Option<&Value>) -> Option<&str> {
    let parts = first_candidate?.get("content")?.get("parts")?.as_array()?;
    if parts.len() > 1 {
        warn!("Multiple parts received, using only the first.");
    }
    parts.first()?.get("text")?.as_str()
}

/// Interprets one HTTP exchange.
///
/// 1. `status != 200` → [`AnalysisError::Api`] with the full body.
/// 2. Body that is not a JSON object → [`AnalysisError::Parse`].
/// 3. Usage counters are read independently, see [`UsageStats`].
/// 4. A missing candidate, content, part or text yields an empty answer,
///    not an error.
///
/// # Errors
///
/// Returns [`AnalysisError::Api`] or [`AnalysisError::Parse`] as above.
///
/// # Example
///
/// ```
/// use debugmate::parse;
///
/// let body = br#"{"candidates":[{"content":{"parts":[{"text":"x starts at 0"}]}}]}"#;
/// let response = parse(200, body).unwrap();
/// assert_eq!(response.answer, "x starts at 0");
/// assert!(response.usage.is_none());
/// ```
pub fn parse(status: u16, body: &[u8]) -> Result<AnalysisResponse, AnalysisError> {
    if status != 200 {
        return Err(AnalysisError::Api {
            status_code: status,
            raw_body: String::from_utf8_lossy(body).into_owned(),
        });
    }

    let text = std::str::from_utf8(body)
        .map_err(|e| AnalysisError::Parse(format!("response body is not UTF-8: {e}")))?;
    let root: Value =
        serde_json::from_str(text).map_err(|e| AnalysisError::Parse(format_json_parse_error(text, &e)))?;
    if !root.is_object() {
        return Err(AnalysisError::Parse(format!(
            "expected a JSON object at the top level, found {}",
            json_type_name(&root)
        )));
    }

    let usage = extract_usage(&root);

    let candidates = root.get("candidates").and_then(Value::as_array);
    if candidates.is_some_and(|c| c.len() > 1) {
        warn!("Multiple candidates received, using only the first.");
    }
    let first_candidate = candidates.and_then(|c| c.first());

    let answer = match extract_answer(first_candidate) {
        Some(text) => text.to_string(),
        None => {
            tracing::debug!("Response has no candidate text; returning an empty answer");
            String::new()
        }
    };

    Ok(AnalysisResponse {
        answer,
        usage,
        finish_reason: first_candidate
            .and_then(|c| c.get("finishReason"))
            .and_then(Value::as_str)
            .map(String::from),
        model_version: root
            .get("modelVersion")
            .and_then(Value::as_str)
            .map(String::from),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(body: &str) -> AnalysisResponse {
        parse(200, body.as_bytes()).expect("expected a successful parse")
    }

    #[test]
    fn test_answer_and_usage() {
        let response = ok(r#"{
            "candidates": [{
                "content": {"parts": [{"text": "count는 0에서 5로 증가합니다"}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 30, "totalTokenCount": 150},
            "modelVersion": "gemini-1.5-flash-002"
        }"#);

        assert_eq!(response.answer, "count는 0에서 5로 증가합니다");
        assert_eq!(
            response.usage,
            Some(UsageStats {
                prompt_tokens: Some(120),
                response_tokens: Some(30),
                total_tokens: Some(150),
            })
        );
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(response.model_version.as_deref(), Some("gemini-1.5-flash-002"));
    }

    #[test]
    fn test_empty_candidates_is_success_with_empty_answer() {
        let response = ok(r#"{"candidates": [], "usageMetadata": {"promptTokenCount": 7}}"#);
        assert_eq!(response.answer, "");
        assert!(!response.has_answer());
        assert_eq!(response.usage.unwrap().prompt_tokens, Some(7));
    }

    #[test]
    fn test_missing_links_yield_empty_answer() {
        for body in [
            r#"{}"#,
            r#"{"candidates": null}"#,
            r#"{"candidates": {}}"#,
            r#"{"candidates": [{}]}"#,
            r#"{"candidates": [{"content": {}}]}"#,
            r#"{"candidates": [{"content": {"parts": []}}]}"#,
            r#"{"candidates": [{"content": {"parts": [{"inlineData": {}}]}}]}"#,
            r#"{"candidates": [{"content": {"parts": [{"text": 42}]}}]}"#,
            r#"{"candidates": ["not an object"]}"#,
        ] {
            let response = ok(body);
            assert_eq!(response.answer, "", "body: {body}");
        }
    }

    #[test]
    fn test_filtered_candidate_reports_finish_reason() {
        let response = ok(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#);
        assert_eq!(response.answer, "");
        assert_eq!(response.finish_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn test_non_200_is_api_error_with_raw_body() {
        let body = r#"{"error": {"code": 404, "message": "models/nope is not found"}}"#;
        let err = parse(404, body.as_bytes()).unwrap_err();
        match err {
            AnalysisError::Api {
                status_code,
                raw_body,
            } => {
                assert_eq!(status_code, 404);
                assert_eq!(raw_body, body);
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_200_success_class_is_still_api_error() {
        // Only exactly 200 carries an answer
        let err = parse(204, b"").unwrap_err();
        assert!(matches!(err, AnalysisError::Api { status_code: 204, .. }));
    }

    #[test]
    fn test_truncated_body_is_parse_error() {
        let err = parse(200, br#"{"candidates": [{"content": {"parts": [{"te"#).unwrap_err();
        match err {
            AnalysisError::Parse(detail) => assert!(detail.contains("JSON parse error")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_body_is_parse_error() {
        assert!(matches!(
            parse(200, b"").unwrap_err(),
            AnalysisError::Parse(_)
        ));
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let err = parse(200, &[b'{', 0xff, 0xfe, b'}']).unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(ref d) if d.contains("UTF-8")));
    }

    #[test]
    fn test_non_object_root_is_parse_error() {
        for body in ["[]", "null", "\"text\"", "42"] {
            let err = parse(200, body.as_bytes()).unwrap_err();
            assert!(matches!(err, AnalysisError::Parse(_)), "body: {body}");
        }
    }

    #[test]
    fn test_usage_fields_are_independent() {
        let response = ok(r#"{"usageMetadata": {"promptTokenCount": 5}}"#);
        let usage = response.usage.expect("usage present");
        assert_eq!(usage.prompt_tokens, Some(5));
        assert_eq!(usage.response_tokens, None);
        assert_eq!(usage.total_tokens, None);
    }

    #[test]
    fn test_usage_absent_is_none() {
        let response = ok(r#"{"candidates": []}"#);
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_usage_empty_object_has_no_data() {
        let usage = ok(r#"{"usageMetadata": {}}"#).usage.unwrap();
        assert!(!usage.has_data());
    }

    #[test]
    fn test_usage_non_numeric_counters_are_skipped() {
        let usage = ok(r#"{"usageMetadata": {
            "promptTokenCount": "12",
            "candidatesTokenCount": -3,
            "totalTokenCount": 1.5
        }}"#)
        .usage
        .unwrap();
        assert_eq!(usage, UsageStats::default());
    }

    #[test]
    fn test_usage_large_counter_is_kept_exactly() {
        let usage = ok(r#"{"usageMetadata": {"totalTokenCount": 99999999999}}"#)
            .usage
            .unwrap();
        assert_eq!(usage.total_tokens, Some(99_999_999_999));
    }

    #[test]
    fn test_usage_metadata_that_is_not_an_object_is_absent() {
        for body in [
            r#"{"candidates": [], "usageMetadata": null}"#,
            r#"{"candidates": [], "usageMetadata": 12}"#,
            r#"{"candidates": [], "usageMetadata": [{"promptTokenCount": 5}]}"#,
        ] {
            assert!(ok(body).usage.is_none(), "body: {body}");
        }
    }

    #[test]
    fn test_first_candidate_and_part_win() {
        let response = ok(r#"{"candidates": [
            {"content": {"parts": [{"text": "first"}, {"text": "second part"}]}},
            {"content": {"parts": [{"text": "second candidate"}]}}
        ]}"#);
        assert_eq!(response.answer, "first");
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let response = AnalysisResponse {
            answer: "x starts at 0".to_string(),
            usage: Some(UsageStats {
                prompt_tokens: Some(5),
                ..Default::default()
            }),
            finish_reason: None,
            model_version: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"answer": "x starts at 0", "usage": {"prompt_tokens": 5}})
        );
    }
}
