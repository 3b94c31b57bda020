//! The network seam: one POST, one fully-buffered response.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client as ReqwestClient;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;

use super::buffer::ResponseBuffer;
use super::common::redact_api_key;
use super::loud_wire;
use crate::errors::AnalysisError;
use crate::prompt::RequestDocument;

/// `Content-Length` values above this are not trusted for pre-allocation.
const MAX_RESERVE_HINT: usize = 1024 * 1024;

/// Status and complete body of one HTTP exchange.
///
/// Any status is a valid `RawResponse`; deciding what a non-200 means is
/// left to [`crate::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Sends a request document and returns whatever came back.
///
/// Implementations must only fail for transport-level problems (DNS,
/// connect, TLS, timeout, allocation). An HTTP error status is a successful
/// exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `document` to `url` with the given extra headers.
    async fn send(
        &self,
        url: &str,
        document: &RequestDocument,
        headers: &HeaderMap,
    ) -> Result<RawResponse, AnalysisError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        url: &str,
        document: &RequestDocument,
        headers: &HeaderMap,
    ) -> Result<RawResponse, AnalysisError> {
        (**self).send(url, document, headers).await
    }
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
///
/// The body is read chunk by chunk into a [`ResponseBuffer`], so an optional
/// size ceiling stops a runaway response before it is fully received.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: ReqwestClient,
    max_response_bytes: Option<usize>,
}

impl HttpTransport {
    #[must_use]
    pub fn new(http_client: ReqwestClient) -> Self {
        Self {
            http_client,
            max_response_bytes: None,
        }
    }

    /// Caps the accumulated response body at `limit` bytes.
    #[must_use]
    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = Some(limit);
        self
    }

    fn new_buffer(&self) -> ResponseBuffer {
        match self.max_response_bytes {
            Some(limit) => ResponseBuffer::with_limit(limit),
            None => ResponseBuffer::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(ReqwestClient::new())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        url: &str,
        document: &RequestDocument,
        headers: &HeaderMap,
    ) -> Result<RawResponse, AnalysisError> {
        let request_id = loud_wire::next_request_id();
        loud_wire::log_request(request_id, "POST", url, document.as_bytes());
        debug!(
            "POST {} ({} byte document)",
            redact_api_key(url),
            document.len()
        );

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .headers(headers.clone())
            .body(document.to_body())
            .send()
            .await
            .map_err(AnalysisError::from_reqwest)?;

        let status = response.status().as_u16();
        loud_wire::log_response_status(request_id, status);

        let mut buffer = self.new_buffer();
        if let Some(length) = response.content_length() {
            let hint = usize::try_from(length).unwrap_or(usize::MAX);
            buffer.reserve_hint(hint.min(MAX_RESERVE_HINT))?;
        }

        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(AnalysisError::from_reqwest)?;
            buffer.append(&chunk)?;
        }

        debug!("Received HTTP {status} with {} byte body", buffer.len());
        let body = buffer.into_bytes();
        loud_wire::log_response_body(request_id, &body);

        Ok(RawResponse { status, body })
    }
}
