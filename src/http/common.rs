/// Represents the API version to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    V1,
    /// V1 Beta API version (current)
    #[default]
    V1Beta,
}

impl ApiVersion {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V1Beta => "v1beta",
        }
    }
}

// --- URL Construction ---
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Header name for API key authentication.
pub const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// Query parameter name for API key authentication.
pub const API_KEY_QUERY_PARAM: &str = "key";

/// How the API key is attached to an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Send the key in the `X-Goog-Api-Key` header. Keeps it out of URLs,
    /// proxy logs and error messages.
    #[default]
    Header,
    /// Append the key as a `key=` query parameter on the endpoint URL.
    QueryParameter,
}

/// Constructs the `generateContent` URL for a model.
///
/// The model name is percent-encoded so that it can only ever occupy one
/// path segment. Authentication is not part of this URL; see
/// [`with_api_key_param`] for [`AuthMode::QueryParameter`].
#[must_use]
pub fn construct_generate_url(base_url: &str, version: ApiVersion, model: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!(
        "{base}/{version}/models/{model}:generateContent",
        version = version.as_str(),
        model = urlencoding::encode(model),
    )
}

/// Appends the API key as a query parameter.
#[must_use]
pub fn with_api_key_param(url: &str, api_key: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{url}{separator}{API_KEY_QUERY_PARAM}={}",
        urlencoding::encode(api_key)
    )
}

/// Replaces the value of a `key=` query parameter with a placeholder so the
/// URL can be logged.
#[must_use]
pub fn redact_api_key(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let redacted = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if name == API_KEY_QUERY_PARAM => {
                format!("{API_KEY_QUERY_PARAM}=REDACTED")
            }
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{redacted}")
}
