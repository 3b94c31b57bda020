//! Credentials and environment-driven defaults.

use std::fmt;
use std::sync::OnceLock;

use crate::errors::AnalysisError;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the service base URL.
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a key.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if the key is empty or
    /// contains characters that cannot appear in an HTTP header.
    pub fn new(key: impl Into<String>) -> Result<Self, AnalysisError> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(AnalysisError::InvalidInput("API key is empty".to_string()));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(AnalysisError::InvalidInput(
                "API key contains whitespace or non-ASCII characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Reads the key from `GEMINI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if the variable is unset or invalid.
    pub fn from_env() -> Result<Self, AnalysisError> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| AnalysisError::InvalidInput(format!("{API_KEY_ENV} is not set")))?;
        Self::new(key)
    }

    /// The raw secret. Only the pipeline should need this.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(REDACTED)")
    }
}

/// Returns `GEMINI_BASE_URL` if set and non-empty.
#[must_use]
pub fn base_url_from_env() -> Option<String> {
    std::env::var(BASE_URL_ENV)
        .ok()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

static GLOBAL_API_KEY: OnceLock<Option<ApiKey>> = OnceLock::new();

/// Process-wide API key, read from `GEMINI_API_KEY` on first use.
///
/// Later changes to the environment are not observed. Used by
/// [`Analyzer::builder_from_env`](crate::Analyzer::builder_from_env).
#[must_use]
pub fn global_api_key() -> Option<&'static ApiKey> {
    GLOBAL_API_KEY.get_or_init(|| ApiKey::from_env().ok()).as_ref()
}

/// Installs the process-wide API key before anything reads it.
///
/// # Errors
///
/// Returns the key back if the global key was already initialized, either
/// by an earlier call or by a read of [`global_api_key`].
pub fn set_global_api_key(key: ApiKey) -> Result<(), ApiKey> {
    let mut pending = Some(key);
    GLOBAL_API_KEY.get_or_init(|| pending.take());
    match pending {
        None => Ok(()),
        Some(rejected) => Err(rejected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("AIzaSecret123").unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("AIzaSecret123"));
        assert!(debug.contains("REDACTED"));
        assert_eq!(key.expose(), "AIzaSecret123");
    }

    #[test]
    fn test_api_key_trims_whitespace() {
        let key = ApiKey::new("  abc123\n").unwrap();
        assert_eq!(key.expose(), "abc123");
    }

    #[test]
    fn test_api_key_rejects_empty() {
        assert!(matches!(
            ApiKey::new("   "),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_api_key_rejects_inner_whitespace() {
        assert!(matches!(
            ApiKey::new("abc def"),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(ApiKey::new("키").is_err());
    }
}
