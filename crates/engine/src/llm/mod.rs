//! LLM integration (§4.5): the seam (`ports`), the production adapter
//! (`ollama`), the timeout/fallback wrapper (`client`), and the replay-mode
//! cache lookup (`replay`).

pub mod client;
pub mod ollama;
pub mod ports;
pub mod replay;

pub use client::{LlmClient, LlmOutcome, DEFAULT_CALL_TIMEOUT};
pub use ollama::OllamaClient;
pub use ports::{LlmError, LlmPort, LlmRequest, LlmResponse};
pub use replay::{CacheKey, ReplayLlmClient};
