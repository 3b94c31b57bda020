//! # debugmate
//!
//! Asks a Gemini model questions about a piece of source code: how a
//! variable's value changes, whether a loop terminates, or anything else.
//!
//! One call runs three stages, stopping at the first failure:
//!
//! 1. [`PayloadBuilder`] embeds the question and code into a prompt
//!    template and serializes the `generateContent` request. User text is
//!    escaped by the JSON serializer, never spliced into the document.
//! 2. A [`Transport`] POSTs the document and accumulates the response body
//!    chunk by chunk in a [`ResponseBuffer`].
//! 3. [`parse`] turns status and body into an [`AnalysisResponse`], or an
//!    [`AnalysisError`] for non-200 statuses and malformed bodies.
//!
//! ```no_run
//! use debugmate::{AnalysisRequest, Analyzer, ApiKey, PromptKind};
//!
//! # async fn example() -> Result<(), debugmate::AnalysisError> {
//! let analyzer = Analyzer::builder(ApiKey::from_env()?).build()?;
//!
//! let request = AnalysisRequest::new("What is the flow of x?", "int x = 0;\nx += 2;\n")
//!     .with_kind(PromptKind::TraceVariables);
//! let response = analyzer.run(&request).await?;
//!
//! println!("{}", response.answer);
//! if let Some(usage) = response.usage {
//!     println!("total tokens: {:?}", usage.total_tokens);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Nothing is retried. [`AnalysisError::is_retryable`] tells callers which
//! failures are worth another attempt.
//!
//! Set `LOUD_WIRE=1` to dump every request and response to stderr (with the
//! API key redacted).

pub mod config;
pub mod errors;
pub mod http;
mod models;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod response;

pub use config::{ApiKey, DEFAULT_MODEL, global_api_key, set_global_api_key};
pub use errors::{AnalysisError, FailureKind};
pub use http::buffer::ResponseBuffer;
pub use http::common::{ApiVersion, AuthMode};
pub use http::transport::{HttpTransport, RawResponse, Transport};
pub use pipeline::{Analyzer, AnalyzerBuilder, run};
pub use prompt::{PayloadBuilder, RequestDocument};
pub use request::{AnalysisRequest, DEFAULT_TEMPERATURE, PromptKind};
pub use response::{AnalysisResponse, UsageStats, parse};
