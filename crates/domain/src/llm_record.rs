//! LLM call record (§3 Data Model — LLM call record; §4.5, §4.15).

use serde::{Deserialize, Serialize};

/// Everything about one call into the LLM, whether it hit the real endpoint
/// or used a fallback. Recorded by the Replay Logger before the call's
/// result is handed back to its caller (§4.5: "Every call is recorded for
/// replay before returning").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallRecord {
    pub frame: u64,
    pub subsystem: String,
    pub seed: u64,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub response: String,
    pub token_count: u32,
    pub duration_ms: u64,
    pub used_fallback: bool,
}
