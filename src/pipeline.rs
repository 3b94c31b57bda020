//! The analysis pipeline: build → send → parse.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as ReqwestClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use crate::config::{API_KEY_ENV, ApiKey, DEFAULT_MODEL, base_url_from_env, global_api_key};
use crate::errors::AnalysisError;
use crate::http::common::{
    API_KEY_HEADER, ApiVersion, AuthMode, DEFAULT_BASE_URL, construct_generate_url,
    redact_api_key, with_api_key_param,
};
use crate::http::transport::{HttpTransport, Transport};
use crate::prompt::{DEFAULT_MAX_DOCUMENT_BYTES, PayloadBuilder};
use crate::request::{AnalysisRequest, PromptKind};
use crate::response::{AnalysisResponse, parse};

/// Runs analysis requests against one configured endpoint.
///
/// Cheap to clone; clones share the HTTP connection pool. Each [`run`](Self::run)
/// owns its own request document and response buffer, so one `Analyzer`
/// can serve concurrent calls.
///
/// # Example
///
/// ```no_run
/// use debugmate::{AnalysisRequest, Analyzer, ApiKey};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), debugmate::AnalysisError> {
/// let analyzer = Analyzer::builder(ApiKey::from_env()?)
///     .timeout(Duration::from_secs(120))
///     .build()?;
///
/// let request = AnalysisRequest::new("What is the flow of x?", "int x = 0; x += 2;");
/// let response = analyzer.run(&request).await?;
/// println!("{}", response.answer);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Analyzer {
    api_key: ApiKey,
    endpoint: String,
    auth_mode: AuthMode,
    payload: PayloadBuilder,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("api_key", &self.api_key)
            .field("endpoint", &self.endpoint)
            .field("auth_mode", &self.auth_mode)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Analyzer`] instances.
///
/// # Example
///
/// ```
/// use debugmate::{Analyzer, ApiKey, AuthMode};
/// use std::time::Duration;
///
/// let analyzer = Analyzer::builder(ApiKey::new("api_key").unwrap())
///     .model("gemini-1.5-pro")
///     .auth_mode(AuthMode::QueryParameter)
///     .connect_timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// assert!(analyzer.endpoint().ends_with("/v1beta/models/gemini-1.5-pro:generateContent"));
/// ```
pub struct AnalyzerBuilder {
    api_key: ApiKey,
    base_url: Option<String>,
    endpoint: Option<String>,
    model: String,
    api_version: ApiVersion,
    auth_mode: AuthMode,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    max_response_bytes: Option<usize>,
    max_document_bytes: usize,
    response_language: Option<String>,
    transport: Option<Arc<dyn Transport>>,
}

impl AnalyzerBuilder {
    /// Sets the service base URL.
    ///
    /// Defaults to `GEMINI_BASE_URL` if set, otherwise the public endpoint.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Uses `endpoint` as the complete `generateContent` URL, ignoring
    /// [`base_url`](Self::base_url), [`model`](Self::model) and
    /// [`api_version`](Self::api_version).
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the model identifier (default `gemini-1.5-flash`).
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub const fn api_version(mut self, api_version: ApiVersion) -> Self {
        self.api_version = api_version;
        self
    }

    /// Selects how the API key is sent (header by default).
    #[must_use]
    pub const fn auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Sets the total request timeout.
    ///
    /// Covers connecting, sending and receiving the whole body. An elapsed
    /// timeout surfaces as [`AnalysisError::Network`] with `timeout: true`.
    /// If not set, uses reqwest's default (no timeout).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Caps the response body size. Larger bodies fail with
    /// [`AnalysisError::OutOfMemory`].
    #[must_use]
    pub const fn max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = Some(limit);
        self
    }

    /// Caps the encoded request document size (default 20 MiB).
    #[must_use]
    pub const fn max_document_bytes(mut self, limit: usize) -> Self {
        self.max_document_bytes = limit;
        self
    }

    /// Language the model is asked to answer in (default Korean).
    #[must_use]
    pub fn response_language(mut self, language: impl Into<String>) -> Self {
        self.response_language = Some(language.into());
        self
    }

    /// Replaces the HTTP transport, e.g. with a mock in tests.
    ///
    /// Timeouts and the response size cap configure the default transport
    /// only and are ignored when a custom one is supplied.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Builds the `Analyzer`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] for an empty model or a base
    /// URL or endpoint that is not an absolute `http(s)` URL with a host, and [`AnalysisError::ClientBuild`] if the
    /// HTTP client cannot be created.
    pub fn build(self) -> Result<Analyzer, AnalysisError> {
        let endpoint = match self.endpoint {
            Some(endpoint) => {
                validate_url(&endpoint)?;
                endpoint
            }
            None => {
                if self.model.trim().is_empty() {
                    return Err(AnalysisError::InvalidInput("model is empty".to_string()));
                }
                let base_url = self
                    .base_url
                    .or_else(base_url_from_env)
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
                validate_url(&base_url)?;
                construct_generate_url(&base_url, self.api_version, self.model.trim())
            }
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = ReqwestClient::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(connect_timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(connect_timeout);
                }
                let http_client = builder
                    .build()
                    .map_err(|e| AnalysisError::ClientBuild(e.to_string()))?;

                let mut transport = HttpTransport::new(http_client);
                if let Some(limit) = self.max_response_bytes {
                    transport = transport.with_max_response_bytes(limit);
                }
                Arc::new(transport)
            }
        };

        let mut payload = PayloadBuilder::new().with_max_document_bytes(self.max_document_bytes);
        if let Some(language) = self.response_language {
            payload = payload.with_response_language(language);
        }

        Ok(Analyzer {
            api_key: self.api_key,
            endpoint,
            auth_mode: self.auth_mode,
            payload,
            transport,
        })
    }
}

/// Requires an absolute http(s) URL with a host.
fn validate_url(url: &str) -> Result<(), AnalysisError> {
    let invalid = |reason: &str| {
        AnalysisError::InvalidInput(format!("endpoint '{url}' is not usable: {reason}"))
    };
    let parsed = reqwest::Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}

impl Analyzer {
    /// Creates a new builder for `Analyzer` instances.
    #[must_use]
    pub fn builder(api_key: ApiKey) -> AnalyzerBuilder {
        AnalyzerBuilder {
            api_key,
            base_url: None,
            endpoint: None,
            model: DEFAULT_MODEL.to_string(),
            api_version: ApiVersion::default(),
            auth_mode: AuthMode::default(),
            timeout: None,
            connect_timeout: None,
            max_response_bytes: None,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            response_language: None,
            transport: None,
        }
    }

    /// Creates a builder using the process-wide key from
    /// [`global_api_key`](crate::global_api_key).
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidInput`] if no valid key is available.
    pub fn builder_from_env() -> Result<AnalyzerBuilder, AnalysisError> {
        global_api_key()
            .cloned()
            .map(Self::builder)
            .ok_or_else(|| AnalysisError::InvalidInput(format!("{API_KEY_ENV} is not set")))
    }

    /// The `generateContent` URL requests go to, without credentials.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn payload_builder(&self) -> &PayloadBuilder {
        &self.payload
    }

    /// Runs one analysis: builds the document, sends it, interprets the reply.
    ///
    /// Stops at the first failing stage and returns its error unchanged.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::Encoding`] if the document cannot be built
    /// - [`AnalysisError::Network`] or [`AnalysisError::OutOfMemory`] from the transport
    /// - [`AnalysisError::Api`] or [`AnalysisError::Parse`] from the interpreter
    pub async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        let document = self.payload.build(request)?;

        let (url, headers) = self.authenticate()?;
        debug!(
            "Running {} analysis against {}",
            request.kind,
            redact_api_key(&url)
        );

        let raw = self.transport.send(&url, &document, &headers).await?;
        drop(document);

        let response = parse(raw.status, &raw.body)?;
        if let Some(usage) = &response.usage {
            debug!(
                "Analysis complete: prompt={:?} response={:?} total={:?} tokens",
                usage.prompt_tokens, usage.response_tokens, usage.total_tokens
            );
        }
        Ok(response)
    }

    /// URL and headers carrying the credential for the configured auth mode.
    fn authenticate(&self) -> Result<(String, HeaderMap), AnalysisError> {
        let mut headers = HeaderMap::new();
        match self.auth_mode {
            AuthMode::Header => {
                let mut value = HeaderValue::from_str(self.api_key.expose()).map_err(|_| {
                    AnalysisError::InvalidInput("API key is not a valid header value".to_string())
                })?;
                value.set_sensitive(true);
                let name = HeaderName::from_bytes(API_KEY_HEADER.as_bytes())
                    .map_err(|e| AnalysisError::InvalidInput(e.to_string()))?;
                headers.insert(name, value);
                Ok((self.endpoint.clone(), headers))
            }
            AuthMode::QueryParameter => Ok((
                with_api_key_param(&self.endpoint, self.api_key.expose()),
                headers,
            )),
        }
    }
}

/// One-shot analysis with the default trace prompt.
///
/// `endpoint` is the complete `generateContent` URL; the key is sent in the
/// `X-Goog-Api-Key` header. Builds a fresh [`Analyzer`] per call, so prefer
/// [`Analyzer`] when sending more than one request.
///
/// # Errors
///
/// See [`Analyzer::run`]. Also returns [`AnalysisError::InvalidInput`] if
/// `endpoint` is not an http(s) URL.
pub async fn run(
    question: &str,
    code: &str,
    temperature: f32,
    endpoint: &str,
    api_key: &ApiKey,
) -> Result<AnalysisResponse, AnalysisError> {
    let analyzer = Analyzer::builder(api_key.clone())
        .endpoint(endpoint)
        .build()?;
    let request = AnalysisRequest::new(question, code)
        .with_temperature(temperature)
        .with_kind(PromptKind::TraceVariables);
    analyzer.run(&request).await
}
