//! Streamed analyst commentary for a priced DCF scenario.

pub mod client;
pub mod error;
pub mod formatters;
pub mod prompt;
pub mod sse;

pub use client::{text_stream, AnthropicClient};
pub use error::{NarrativeError, NarrativeResult};
pub use prompt::{build_prompt, NarrativePrompt, SYSTEM_PROMPT};
pub use sse::{SseDecoder, SseEvent};

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::Stream;

/// Text chunks in arrival order
pub type NarrativeStream = Pin<Box<dyn Stream<Item = NarrativeResult<String>> + Send>>;

/// Backend-agnostic commentary generator.
///
/// Implemented by the Anthropic client; tests substitute canned streams.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, prompt: &NarrativePrompt) -> NarrativeResult<NarrativeStream>;

    fn backend_name(&self) -> &'static str;
}

/// Configuration for the narrative service
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    /// Absent means narrative generation is disabled
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            api_url: std::env::var("ANTHROPIC_API_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".to_string()),
            model: std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-5-20250929".to_string()),
            max_tokens: std::env::var("NARRATIVE_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(350),
            timeout: Duration::from_secs(
                std::env::var("NARRATIVE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

impl NarrativeConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
