//! Language model provider boundary.
//!
//! Agents talk to exactly one provider through the [`LlmClient`] trait: a
//! single `complete` call taking a system prompt, a user prompt, a sampling
//! temperature and a token budget, returning the raw reply text. Which
//! provider backs the trait is decided once at startup by [`from_config`];
//! when no API key is configured the factory returns `None` and agents run
//! degraded (the think stage reports that no model is available).

mod anthropic;
mod openai;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

use crate::config::Config;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("provider returned an empty completion")]
    EmptyResponse,
}

/// One-shot completion call against a chat model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a system prompt and a user prompt, get the reply text back.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;

    /// Model identifier this client was constructed with.
    fn model(&self) -> &str;
}

/// Pick a provider from the configured keys. OpenAI wins when both keys are
/// present; neither key means degraded mode.
pub fn from_config(config: &Config) -> Option<Arc<dyn LlmClient>> {
    if let Some(key) = &config.openai_api_key {
        info!(model = %config.default_model, "using OpenAI provider");
        return Some(Arc::new(OpenAiClient::new(
            key.clone(),
            config.default_model.clone(),
        )));
    }
    if let Some(key) = &config.anthropic_api_key {
        info!(model = %config.default_model, "using Anthropic provider");
        return Some(Arc::new(AnthropicClient::new(
            key.clone(),
            config.default_model.clone(),
        )));
    }
    warn!("no OPENAI_API_KEY or ANTHROPIC_API_KEY set; agents will run without a language model");
    None
}

/// Truncate an error body to a loggable size without splitting a UTF-8
/// character.
pub(crate) fn truncate_message(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut idx = max_len;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    format!("{}... ({} bytes total)", &s[..idx], s.len())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic clients for run-loop and handler tests.

    use super::*;

    /// Always replies with the same fixed text.
    pub struct StubLlm {
        pub reply: String,
    }

    impl StubLlm {
        pub fn new(reply: &str) -> Arc<dyn LlmClient> {
            Arc::new(Self {
                reply: reply.to_string(),
            })
        }
    }

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn complete(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, ProviderError> {
            Ok(self.reply.clone())
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    /// Always fails, for exercising the degraded think path.
    pub struct FailingLlm;

    impl FailingLlm {
        pub fn new() -> Arc<dyn LlmClient> {
            Arc::new(Self)
        }
    }

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn complete(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::Api {
                status: 500,
                message: "stub provider failure".to_string(),
            })
        }

        fn model(&self) -> &str {
            "failing-stub"
        }
    }
}
