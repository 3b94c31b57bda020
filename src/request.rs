//! The caller-facing analysis request.

use std::fmt;
use std::str::FromStr;

/// Sampling temperature used when the caller does not pick one.
///
/// Low on purpose: the same code and question should yield the same trace.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Which instruction template wraps the question and code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum PromptKind {
    /// Trace how the variables named in the question change through the code.
    #[default]
    TraceVariables,
    /// Check the loops in the code for termination problems.
    LoopCheck,
    /// Send the question and code with no extra instructions.
    Freeform,
}

impl PromptKind {
    /// All kinds, in display order.
    pub const ALL: [PromptKind; 3] = [Self::TraceVariables, Self::LoopCheck, Self::Freeform];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TraceVariables => "trace",
            Self::LoopCheck => "loop-check",
            Self::Freeform => "freeform",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" | "trace-var" | "tracevar" => Ok(Self::TraceVariables),
            "loop" | "loop-check" | "loopcheck" => Ok(Self::LoopCheck),
            "freeform" | "plain" => Ok(Self::Freeform),
            other => Err(format!(
                "unknown prompt kind '{other}' (expected one of: trace, loop-check, freeform)"
            )),
        }
    }
}

/// One question about one piece of source code.
///
/// `question` and `code` are opaque text: they may contain quotes,
/// backslashes, newlines or any other characters and are escaped by the
/// payload builder, never spliced into the wire format.
///
/// # Example
///
/// ```
/// use debugmate::{AnalysisRequest, PromptKind};
///
/// let request = AnalysisRequest::new("What is the flow of x?", "int main(){int x=0; return x;}")
///     .with_temperature(0.3)
///     .with_kind(PromptKind::TraceVariables);
/// assert_eq!(request.temperature, 0.3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Natural-language question about the code
    pub question: String,
    /// Source code the question refers to
    pub code: String,
    /// Sampling temperature, must lie in `[0, 1]`
    pub temperature: f32,
    /// Instruction template to use
    pub kind: PromptKind,
    /// Upper bound on generated tokens, if any
    pub max_output_tokens: Option<u32>,
}

impl AnalysisRequest {
    #[must_use]
    pub fn new(question: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            code: code.into(),
            temperature: DEFAULT_TEMPERATURE,
            kind: PromptKind::default(),
            max_output_tokens: None,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: PromptKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let request = AnalysisRequest::new("q", "c");
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(request.kind, PromptKind::TraceVariables);
        assert!(request.max_output_tokens.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let request = AnalysisRequest::new("q", "c")
            .with_temperature(0.0)
            .with_kind(PromptKind::LoopCheck)
            .with_max_output_tokens(2048);
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.kind, PromptKind::LoopCheck);
        assert_eq!(request.max_output_tokens, Some(2048));
    }

    #[test]
    fn test_prompt_kind_from_str() {
        assert_eq!("trace".parse::<PromptKind>(), Ok(PromptKind::TraceVariables));
        assert_eq!("LOOP".parse::<PromptKind>(), Ok(PromptKind::LoopCheck));
        assert_eq!("loop-check".parse::<PromptKind>(), Ok(PromptKind::LoopCheck));
        assert_eq!("plain".parse::<PromptKind>(), Ok(PromptKind::Freeform));

        let err = "lint".parse::<PromptKind>().unwrap_err();
        assert!(err.contains("unknown prompt kind 'lint'"));
    }

    #[test]
    fn test_prompt_kind_display_parses_back() {
        for kind in PromptKind::ALL {
            assert_eq!(kind.to_string().parse::<PromptKind>(), Ok(kind));
        }
    }
}
