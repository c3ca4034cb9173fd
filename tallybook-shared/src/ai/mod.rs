/// AI text generation
///
/// Providers sit behind the [`TextGenerator`] trait so that handlers never
/// depend on a specific vendor API. Two HTTP clients are provided:
/// [`gemini::GeminiClient`] and [`openai::OpenAiClient`].
///
/// # Example
///
/// ```no_run
/// use tallybook_shared::ai::{gemini::GeminiClient, TextGenerator};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GeminiClient::new("api-key", "gemini-2.5-flash");
/// let generation = client.generate(None, "Resuma minhas vendas").await?;
/// println!("{} ({:?} tokens)", generation.text, generation.tokens_used);
/// # Ok(())
/// # }
/// ```

pub mod context;
pub mod gemini;
pub mod openai;
pub mod prompts;

use async_trait::async_trait;
use std::time::Duration;

/// Timeout for a single provider call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Text produced by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Trimmed, never empty
    pub text: String,

    /// Total tokens billed, when the provider reports it
    pub tokens_used: Option<i32>,
}

/// Error type for AI providers
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// No API key configured for the provider
    #[error("AI provider is not configured")]
    NotConfigured,

    /// Provider rejected the call for quota or rate limits
    #[error("AI provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Provider answered without text
    #[error("AI provider returned an empty response")]
    EmptyResponse,

    /// Transport failure
    #[error("AI request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("AI provider error ({status}): {body}")]
    Api { status: u16, body: String },
}

impl AiError {
    /// Classifies a non-success response as quota or generic API error
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 || is_quota_message(&body) {
            AiError::QuotaExceeded(body)
        } else {
            AiError::Api { status, body }
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, AiError::QuotaExceeded(_))
    }
}

/// Whether a provider message describes a quota or rate limit
pub fn is_quota_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("quota") || lower.contains("rate limit") || lower.contains("too many requests")
}

/// A text-generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for `prompt`, optionally steered by a system instruction
    ///
    /// # Errors
    ///
    /// - `AiError::QuotaExceeded` on 429 or quota messages
    /// - `AiError::EmptyResponse` if the provider returned no text
    async fn generate(&self, system: Option<&str>, prompt: &str) -> Result<Generation, AiError>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

/// Wraps provider output, rejecting blank text
pub(crate) fn into_generation(text: Option<String>, tokens_used: Option<i32>) -> Result<Generation, AiError> {
    let text = text.map(|t| t.trim().to_string()).unwrap_or_default();
    if text.is_empty() {
        return Err(AiError::EmptyResponse);
    }

    Ok(Generation { text, tokens_used })
}
