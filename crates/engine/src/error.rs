//! Engine-level error taxonomy (§7 Error Handling Design).
//!
//! `DomainError` (from `wrldbldr-domain`) converts into `EngineError::Invariant`
//! at the boundary, the same layered-error pattern the teacher uses between
//! its domain and application layers.

use thiserror::Error;
use wrldbldr_domain::DomainError;

/// Why a user-requested action didn't happen. Never mutates state; always
/// reported back to the caller via `action_executed{success:false}` (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserInputError {
    #[error("target not found: {0}")]
    TargetNotFound(String),
    #[error("location not discovered: {0}")]
    LocationNotDiscovered(String),
    #[error("insufficient gold: need {needed}, have {have}")]
    InsufficientGold { needed: u32, have: u32 },
    #[error("inventory full")]
    InventoryFull,
    #[error("already at destination")]
    AlreadyAtDestination,
    #[error("conversation needs at least two participants")]
    NotEnoughParticipants,
    #[error("action not allowed right now: {0}")]
    NotAllowed(String),
}

/// Reason an LLM call fell back to canned content (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackReason {
    LlmTimeout,
    LlmUnavailable,
    LlmError,
    ParseError,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackReason::LlmTimeout => "LLM_TIMEOUT",
            FallbackReason::LlmUnavailable => "LLM_UNAVAILABLE",
            FallbackReason::LlmError => "LLM_ERROR",
            FallbackReason::ParseError => "PARSE_ERROR",
        }
    }
}

/// Top-level engine error (§7 taxonomy).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("user input error: {0}")]
    UserInput(#[from] UserInputError),

    #[error("invariant violation: {0}")]
    Invariant(String),

    #[error("replay corruption: {0}")]
    Replay(String),

    #[error("stop requested")]
    Stop,
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        EngineError::Invariant(value.to_string())
    }
}
