use thiserror::Error;

use crate::http::error_helpers::truncate_for_context;

/// Maximum characters of an error body shown in `Display` output.
///
/// The full body is always kept in `AnalysisError::Api::raw_body`.
const ERROR_BODY_DISPLAY_LENGTH: usize = 200;

fn timeout_suffix(timeout: &bool) -> &'static str {
    if *timeout { " (timeout)" } else { "" }
}

/// Coarse category of an [`AnalysisError`], one per pipeline stage.
///
/// Useful when the caller only needs to branch on *where* the pipeline
/// stopped, e.g. for metrics labels or user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FailureKind {
    /// The request document could not be built.
    Encoding,
    /// The HTTP exchange itself failed (DNS, connect, TLS, timeout).
    Network,
    /// The service answered with a non-200 status.
    Api,
    /// The service answered 200 but the body was not a valid document.
    Parse,
    /// The response buffer could not grow.
    OutOfMemory,
    /// The pipeline was misconfigured before any request was made.
    Configuration,
}

/// Defines errors that can occur while running an analysis request.
///
/// Every stage of the pipeline maps its internal faults to exactly one
/// variant and stops; nothing is retried internally.
///
/// # Example: Handling API Errors
///
/// ```ignore
/// match analyzer.run(&request).await {
///     Err(AnalysisError::Api { status_code: 429, .. }) => {
///         tracing::warn!("Rate limited");
///         // Retry with backoff
///     }
///     Err(AnalysisError::Api { status_code, raw_body }) => {
///         tracing::error!("API error {}: {}", status_code, raw_body);
///     }
///     // ...
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalysisError {
    /// The request document could not be produced, e.g. the temperature is
    /// out of range or the encoded document exceeds the size ceiling.
    #[error("Request encoding error: {0}")]
    Encoding(String),
    /// Transport-level failure: DNS, connect, TLS, body read, or timeout.
    #[error("Network error{}: {message}", timeout_suffix(.timeout))]
    Network {
        /// Human-readable description of the transport failure
        message: String,
        /// `true` when the failure was caused by an elapsed timeout
        timeout: bool,
    },
    /// The service returned a non-200 status.
    ///
    /// Contains the HTTP status code (for retry logic) and the complete
    /// response body for diagnostics.
    #[error("API error (HTTP {status_code}): {}", truncate_for_context(.raw_body, ERROR_BODY_DISPLAY_LENGTH))]
    Api {
        /// HTTP status code (e.g., 400, 404, 429, 500)
        status_code: u16,
        /// Complete response body as received
        raw_body: String,
    },
    /// The 200 response body was not a valid structured document.
    #[error("Response parse error: {0}")]
    Parse(String),
    /// The response buffer could not reserve room for an incoming chunk.
    #[error("Out of memory while buffering response ({requested} bytes requested)")]
    OutOfMemory {
        /// Total buffer size that could not be reserved
        requested: usize,
    },
    /// The pipeline was configured with an unusable value, e.g. a missing
    /// API key or an endpoint that is not an http(s) URL.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Failed to build the HTTP client.
    ///
    /// This typically only occurs in exceptional circumstances such as
    /// TLS backend initialization failures.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl AnalysisError {
    /// Returns the pipeline stage this error belongs to.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Encoding(_) => FailureKind::Encoding,
            Self::Network { .. } => FailureKind::Network,
            Self::Api { .. } => FailureKind::Api,
            Self::Parse(_) => FailureKind::Parse,
            Self::OutOfMemory { .. } => FailureKind::OutOfMemory,
            Self::InvalidInput(_) | Self::ClientBuild(_) => FailureKind::Configuration,
        }
    }

    /// Returns `true` if this error is likely transient and the request may succeed on retry.
    ///
    /// - **Network errors and timeouts**: connection resets, DNS hiccups
    /// - **Rate limits (429)**: temporary throttling, retry after backoff
    /// - **Server errors (5xx)**: temporary server issues
    ///
    /// Everything else is permanent. The pipeline itself never retries.
    ///
    /// # Example
    ///
    /// ```rust
    /// use debugmate::AnalysisError;
    ///
    /// let rate_limited = AnalysisError::Api {
    ///     status_code: 429,
    ///     raw_body: "Resource exhausted".to_string(),
    /// };
    /// assert!(rate_limited.is_retryable());
    ///
    /// let not_found = AnalysisError::Api {
    ///     status_code: 404,
    ///     raw_body: "models/nope is not found".to_string(),
    /// };
    /// assert!(!not_found.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Api { status_code, .. } => *status_code == 429 || *status_code >= 500,
            Self::Encoding(_)
            | Self::Parse(_)
            | Self::OutOfMemory { .. }
            | Self::InvalidInput(_)
            | Self::ClientBuild(_) => false,
        }
    }

    /// Returns `true` if this is a network error caused by an elapsed timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { timeout: true, .. })
    }

    /// Maps a reqwest failure to [`AnalysisError::Network`].
    ///
    /// The request URL is stripped from the message since it may carry the
    /// API key as a query parameter.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        let timeout = err.is_timeout();
        Self::Network {
            message: err.without_url().to_string(),
            timeout,
        }
    }
}
