//! Common test utilities shared across integration test files.
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use debugmate::{Analyzer, ApiKey};
use wiremock::MockServer;

/// Key used against mock servers. Never a real credential.
pub const TEST_API_KEY: &str = "test-api-key-0123";

pub fn api_key() -> ApiKey {
    ApiKey::new(TEST_API_KEY).expect("valid test key")
}

/// An analyzer pointed at a mock server with default settings.
pub fn analyzer_for(mock_server: &MockServer) -> Analyzer {
    Analyzer::builder(api_key())
        .base_url(mock_server.uri())
        .build()
        .expect("analyzer should build")
}

/// A typical successful variable-trace response.
pub fn flow_response_json() -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {
                "parts": [{"text": "Variable Name: x (in main function)\n[Initial Value] 0\n[Final Value] 0"}],
                "role": "model"
            },
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 250,
            "candidatesTokenCount": 20,
            "totalTokenCount": 270
        },
        "modelVersion": "gemini-1.5-flash-002"
    })
}
