//! debugmate CLI - ask a Gemini model about a source file.
//!
//! # Examples
//!
//! ```bash
//! # Trace a variable through a file
//! debugmate --file main.c "What is the flow of count?"
//!
//! # Check loops, reading the code from stdin
//! cat main.c | debugmate --kind loop-check "Does this terminate?"
//!
//! # JSON output for scripting
//! debugmate --file main.c --format json "What is the flow of x?"
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use debugmate::{
    AnalysisError, AnalysisRequest, AnalysisResponse, Analyzer, ApiKey, AuthMode,
    DEFAULT_TEMPERATURE, FailureKind, PromptKind,
};

/// Ask a Gemini model questions about source code.
#[derive(Parser)]
#[command(name = "debugmate")]
#[command(version)]
#[command(about = "Ask a Gemini model questions about source code")]
pub struct Cli {
    /// The question to ask about the code.
    pub question: String,

    /// Source file to analyze. Reads stdin when omitted or "-".
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Prompt template.
    #[arg(long, short, default_value = "trace")]
    pub kind: PromptKind,

    /// Sampling temperature in [0, 1].
    #[arg(long, short, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Upper bound on generated tokens.
    #[arg(long)]
    pub max_output_tokens: Option<u32>,

    /// Model identifier.
    #[arg(long, short, env = "GEMINI_MODEL", default_value = debugmate::DEFAULT_MODEL)]
    pub model: String,

    /// Service base URL.
    #[arg(long, env = "GEMINI_BASE_URL")]
    pub base_url: Option<String>,

    /// API key. Falls back to `GEMINI_API_KEY`.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Send the API key as a query parameter instead of a header.
    #[arg(long)]
    pub key_in_query: bool,

    /// Language the answer should be written in.
    #[arg(long, short)]
    pub language: Option<String>,

    /// Total request timeout in seconds.
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Output format (text or json).
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Verbose output (show debug info).
    #[arg(long, short)]
    pub verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Answer text followed by token usage.
    #[default]
    Text,
    /// The whole response as JSON.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
enum ExitCode {
    Error = 1,
    Network = 2,
    Api = 3,
    Parse = 4,
}

impl ExitCode {
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<AnalysisError>().map(AnalysisError::kind) {
            Some(FailureKind::Network) => Self::Network,
            Some(FailureKind::Api) => Self::Api,
            Some(FailureKind::Parse) => Self::Parse,
            _ => Self::Error,
        }
    }
}

fn setup_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debugmate=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debugmate=warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Reads the code to analyze from a file, or stdin for `None` and `-`.
fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read source file {}", path.display())),
        _ => {
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .context("Failed to read source code from stdin")?;
            Ok(code)
        }
    }
}

fn print_text(response: &AnalysisResponse) {
    if response.has_answer() {
        println!("{}", response.answer);
    } else {
        let reason = response.finish_reason.as_deref().unwrap_or("unknown");
        println!("{} (finish reason: {reason})", "No answer returned".yellow());
    }

    if let Some(usage) = response.usage.filter(|u| u.has_data()) {
        let count = |n: Option<u64>| n.map_or_else(|| "-".to_string(), |n| n.to_string());
        eprintln!();
        eprintln!(
            "{} prompt {} | response {} | total {}",
            "Tokens:".dimmed(),
            count(usage.prompt_tokens),
            count(usage.response_tokens),
            count(usage.total_tokens),
        );
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let code = read_source(cli.file.as_deref())?;
    let builder = match &cli.api_key {
        Some(key) => Analyzer::builder(ApiKey::new(key.as_str())?),
        None => Analyzer::builder_from_env()
            .context("No API key: pass --api-key or set GEMINI_API_KEY")?,
    };

    let mut builder = builder
        .model(cli.model.as_str())
        .timeout(Duration::from_secs(cli.timeout))
        .connect_timeout(Duration::from_secs(10));
    if let Some(base_url) = &cli.base_url {
        builder = builder.base_url(base_url.as_str());
    }
    if cli.key_in_query {
        builder = builder.auth_mode(AuthMode::QueryParameter);
    }
    if let Some(language) = &cli.language {
        builder = builder.response_language(language.as_str());
    }
    let analyzer = builder.build()?;

    let mut request = AnalysisRequest::new(cli.question.as_str(), code)
        .with_temperature(cli.temperature)
        .with_kind(cli.kind);
    if let Some(max) = cli.max_output_tokens {
        request = request.with_max_output_tokens(max);
    }

    let response = analyzer.run(&request).await?;

    match cli.format {
        OutputFormat::Text => print_text(&response),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&response)
                .context("Failed to serialize response")?;
            println!("{json}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {e}", "Error:".red().bold());
        if let Some(AnalysisError::Api { raw_body, .. }) = e.downcast_ref::<AnalysisError>()
            && cli.verbose
        {
            eprintln!("{raw_body}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}
