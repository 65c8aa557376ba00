//! The seam between the engine and whatever text-generation backend is
//! configured (§6 "LLM endpoint"). Grounded on the teacher's
//! `infrastructure::ports::LlmPort` trait.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub token_count: u32,
}

#[derive(Debug, Error, Clone)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("timed out")]
    TimedOut,
}

/// A text-generation backend. One production adapter (`OllamaClient`); tests
/// use a canned double instead of standing up a real server.
#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError>;
}
