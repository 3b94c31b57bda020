//! Payload construction: question + code → request document.
//!
//! The instruction template is rendered to plain text first, and the text is
//! then placed into typed request structs that `serde_json` serializes. Quotes,
//! backslashes and control characters in the question or the code are escaped
//! by the serializer, so no input can change the shape of the document.

use bytes::Bytes;
use std::io;

use crate::errors::AnalysisError;
use crate::models::{Content, GenerateContentRequest, GenerationConfig, Part};
use crate::request::{AnalysisRequest, PromptKind};

/// Default ceiling for an encoded request document (20 MiB, the service's
/// inline request limit).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Language the instruction templates ask the model to answer in.
pub const DEFAULT_RESPONSE_LANGUAGE: &str = "Korean";

/// A serialized, ready-to-send request body.
///
/// Always valid UTF-8 JSON. Cloning is cheap, so the same document can be
/// resent by a caller-side retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDocument {
    body: Bytes,
}

impl RequestDocument {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Returns the body for an HTTP request without copying.
    #[must_use]
    pub fn to_body(&self) -> Bytes {
        self.body.clone()
    }
}

/// Counts bytes written without storing them.
#[derive(Default)]
struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Builds request documents from [`AnalysisRequest`]s.
///
/// Pure: the same request always produces a byte-identical document.
///
/// # Example
///
/// ```
/// use debugmate::{AnalysisRequest, PayloadBuilder};
///
/// let builder = PayloadBuilder::new();
/// let request = AnalysisRequest::new("What is the flow of x?", "int x = \"0\";\n");
/// let document = builder.build(&request).unwrap();
///
/// let parsed: serde_json::Value = serde_json::from_slice(document.as_bytes()).unwrap();
/// assert_eq!(parsed["generationConfig"]["temperature"], 0.3);
/// ```
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    max_document_bytes: usize,
    response_language: String,
}

impl Default for PayloadBuilder {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            response_language: DEFAULT_RESPONSE_LANGUAGE.to_string(),
        }
    }
}

impl PayloadBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest encoded document [`build`](Self::build) will produce.
    #[must_use]
    pub fn with_max_document_bytes(mut self, max_document_bytes: usize) -> Self {
        self.max_document_bytes = max_document_bytes;
        self
    }

    /// Sets the language the model is asked to answer in.
    #[must_use]
    pub fn with_response_language(mut self, language: impl Into<String>) -> Self {
        self.response_language = language.into();
        self
    }

    #[must_use]
    pub fn max_document_bytes(&self) -> usize {
        self.max_document_bytes
    }

    /// Renders the instruction text for a request, before any escaping.
    #[must_use]
    pub fn render_prompt(&self, kind: PromptKind, question: &str, code: &str) -> String {
        let language = &self.response_language;
        match kind {
            PromptKind::TraceVariables => format!(
                "Analyze the following C code and the user's question to trace the flow of variables.\n\
                 \n\
                 **User Question:**\n\
                 \"{question}\"\n\
                 \n\
                 **Code:**\n\
                 ```\n\
                 {code}\n\
                 ```\n\
                 \n\
                 **Instructions:**\n\
                 1. Analyze the user's natural language query to understand their intent. If there are typos, infer the most likely correct variable or function name.\n\
                 2. Only trace the variable(s) explicitly mentioned in the question. If no variable is mentioned, explain the flow of all key variables in the code.\n\
                 3. If the query mentions a struct, union, or enum variable:\n\
                 \x20  - struct: trace the flow of each member variable (or only the member named, e.g. \"myStruct.age\").\n\
                 \x20  - union: state that members share memory and trace the member most recently assigned.\n\
                 \x20  - enum: trace the variable and name the constant it holds at each point.\n\
                 4. For pointer-to-pointer variables (e.g. int **ptr), report both the address held and the value pointed to.\n\
                 5. If the question is not related to variable tracing, respond with \"The question is not related to variable tracing.\"\n\
                 6. Respond in {language}.\n\
                 \n\
                 **Response Format:**\n\
                 Variable Name: variable_name (in function_name function)\n\
                 [Initial Value] the initial numeric or literal value only\n\
                 [Update Process]\n\
                 \x20 - one short bullet per change\n\
                 [Final Value] the final value only\n\
                 \n\
                 Write the section titles in English (Variable Name, Initial Value, Update Process, Final Value) and the explanations in {language}.\n\
                 Do not add anything outside this format."
            ),
            PromptKind::LoopCheck => format!(
                "Analyze the loops in the following C code for termination issues.\n\
                 \n\
                 **User Question:**\n\
                 \"{question}\"\n\
                 \n\
                 **Code:**\n\
                 ```\n\
                 {code}\n\
                 ```\n\
                 \n\
                 **Instructions:**\n\
                 1. If the question names specific loops (by position, type, function or line), analyze only those; otherwise analyze every loop.\n\
                 2. Analyze loops in source order and mention each loop only once.\n\
                 3. For a loop that may not terminate, explain why and give one or two concrete fixes.\n\
                 4. If no loop has a problem, say so in one sentence.\n\
                 5. Respond in {language}.\n\
                 \n\
                 **Response Format:**\n\
                 - Loop N\n\
                 \tproblem description\n\
                 \tFix 1: concrete change\n\
                 \tFix 2: alternative change (if any)\n\
                 \n\
                 Do not repeat these instructions in the response."
            ),
            PromptKind::Freeform => format!(
                "**User Question:**\n\
                 \"{question}\"\n\
                 \n\
                 **Code:**\n\
                 ```\n\
                 {code}\n\
                 ```"
            ),
        }
    }

    fn wire_request(&self, request: &AnalysisRequest) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: self.render_prompt(request.kind, &request.question, &request.code),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        }
    }

    fn validate_temperature(temperature: f32) -> Result<(), AnalysisError> {
        if temperature.is_finite() && (0.0..=1.0).contains(&temperature) {
            Ok(())
        } else {
            Err(AnalysisError::Encoding(format!(
                "temperature {temperature} is outside [0, 1]"
            )))
        }
    }

    /// Returns the exact size the encoded document would have, without
    /// allocating it.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Encoding`] if the request cannot be encoded.
    pub fn encoded_len(&self, request: &AnalysisRequest) -> Result<usize, AnalysisError> {
        Self::validate_temperature(request.temperature)?;
        let mut counter = ByteCounter::default();
        serde_json::to_writer(&mut counter, &self.wire_request(request))
            .map_err(|e| AnalysisError::Encoding(e.to_string()))?;
        Ok(counter.0)
    }

    /// Checks that a request fits under the document ceiling before building.
    ///
    /// Returns the encoded size on success.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Encoding`] if the request cannot be encoded or
    /// is too large.
    pub fn check_size(&self, request: &AnalysisRequest) -> Result<usize, AnalysisError> {
        let len = self.encoded_len(request)?;
        self.ensure_within_limit(len)?;
        Ok(len)
    }

    fn ensure_within_limit(&self, len: usize) -> Result<(), AnalysisError> {
        if len > self.max_document_bytes {
            return Err(AnalysisError::Encoding(format!(
                "encoded request is {len} bytes, limit is {} bytes",
                self.max_document_bytes
            )));
        }
        Ok(())
    }

    /// Builds the request document.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Encoding`] if the temperature is not a finite
    /// value in `[0, 1]` or the encoded document exceeds the ceiling.
    pub fn build(&self, request: &AnalysisRequest) -> Result<RequestDocument, AnalysisError> {
        Self::validate_temperature(request.temperature)?;
        let body = serde_json::to_vec(&self.wire_request(request))
            .map_err(|e| AnalysisError::Encoding(e.to_string()))?;
        self.ensure_within_limit(body.len())?;

        tracing::debug!(
            "Built {} request document ({} bytes)",
            request.kind,
            body.len()
        );

        Ok(RequestDocument {
            body: Bytes::from(body),
        })
    }
}
