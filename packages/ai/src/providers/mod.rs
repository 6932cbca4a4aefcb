//! Text-completion provider abstraction.
//!
//! The prediction flows only ever need `prompt -> text`, so the boundary is
//! a single method. Gemini is the only hosted implementation; tests plug in
//! scripted providers.

pub mod gemini;

use std::time::Duration;

use crate::AiError;

/// Model used when `AI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Completion timeout used when `AI_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for text-completion providers.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Sends `prompt` and returns the model's text answer.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the answer cannot be read.
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;

    /// Identifier of the model answering, recorded in forecast metadata.
    fn model(&self) -> &str;
}

/// AI settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    /// `GEMINI_API_KEY`; `None` disables the AI subsystem.
    pub api_key: Option<String>,
    /// `AI_MODEL`, default [`DEFAULT_MODEL`].
    pub model: String,
    /// `AI_TIMEOUT_SECS`, default [`DEFAULT_TIMEOUT`].
    pub timeout: Duration,
}

impl AiConfig {
    /// Reads `GEMINI_API_KEY`, `AI_MODEL` and `AI_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let model = std::env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout = std::env::var("AI_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    log::warn!("Ignoring invalid AI_TIMEOUT_SECS value: {secs}");
                    None
                }
            })
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            api_key,
            model,
            timeout,
        }
    }
}

/// Creates a completion provider from `config`.
///
/// Returns `None` when no API key is configured. That is a disabled
/// state, not an error.
#[must_use]
pub fn create_provider(config: &AiConfig) -> Option<Box<dyn CompletionProvider>> {
    let Some(api_key) = &config.api_key else {
        log::warn!(
            "GEMINI_API_KEY not set. AI predictions are disabled; \
             statistical and mock fallbacks will be used."
        );
        return None;
    };

    log::info!("AI predictions enabled with model {}", config.model);
    Some(Box::new(gemini::GeminiProvider::new(
        api_key.clone(),
        config.model.clone(),
        config.timeout,
    )))
}
