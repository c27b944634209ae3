//! Text generation provider trait.

use anyhow::Result;
use async_trait::async_trait;

/// One generation call: a system message, a user message, and sampling
/// bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait for text generation (chat completion) backends.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;
    /// Generate a completion for the request.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String>;
}
