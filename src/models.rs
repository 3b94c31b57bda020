//! Wire types for the `generateContent` request body.
//!
//! Only the fields this crate sends are modeled. Responses are read
//! field-by-field in [`crate::response`] instead, so that a missing or
//! mistyped optional field never fails the whole document.

use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

/// A message made of one or more parts.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Part {
    pub text: String,
}

/// Sampling parameters.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_uses_camel_case_and_skips_none() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "Hello".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                max_output_tokens: None,
            },
        };

        let json = serde_json::to_string(&request).expect("Serialization failed");
        assert_eq!(
            json,
            r#"{"contents":[{"parts":[{"text":"Hello"}]}],"generationConfig":{"temperature":0.3}}"#
        );
    }

    #[test]
    fn test_serialize_max_output_tokens() {
        let config = GenerationConfig {
            temperature: 1.0,
            max_output_tokens: Some(1000),
        };
        let value = serde_json::to_value(&config).expect("Serialization failed");
        assert_eq!(value["maxOutputTokens"], 1000);
        assert_eq!(value["temperature"], 1.0);
    }
}
