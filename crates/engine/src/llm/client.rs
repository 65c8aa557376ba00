//! The LLM Client component itself (§4.5): wraps an [`LlmPort`] with an
//! abort-deadline timeout and a caller-supplied fallback producer.
//!
//! Diverges deliberately from the teacher's `ResilientLlmClient`, which
//! retries a failed call with exponential backoff before giving up. This
//! spec wants the fallback to trigger on the *first* failure — no retries —
//! so `generate` here is a single attempt plus fallback, not a retry loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::ports::{LlmError, LlmPort, LlmRequest, LlmResponse};
use crate::error::FallbackReason;

/// Default abort deadline for a single LLM call (§4.5: "a call that takes
/// longer than its abort deadline is treated as a timeout, not awaited
/// indefinitely").
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Outcome of a call through [`LlmClient::generate`]. Callers always get a
/// usable `text`, whether it came from the model or a fallback producer —
/// the fallback/reason fields just tell them which.
#[derive(Debug, Clone)]
pub struct LlmOutcome {
    pub text: String,
    pub token_count: u32,
    pub used_fallback: bool,
    pub fallback_reason: Option<FallbackReason>,
}

#[derive(Clone)]
pub struct LlmClient {
    port: Arc<dyn LlmPort>,
    timeout: Duration,
    model: String,
}

impl LlmClient {
    pub fn new(port: Arc<dyn LlmPort>, model: impl Into<String>) -> Self {
        Self {
            port,
            timeout: DEFAULT_CALL_TIMEOUT,
            model: model.into(),
        }
    }

    pub fn with_timeout(port: Arc<dyn LlmPort>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            port,
            timeout,
            model: model.into(),
        }
    }

    /// The model name every subsystem should stamp onto its `LlmRequest`s
    /// (§6 `--model` flag) — kept on the client so it's configured once at
    /// bootstrap rather than hardcoded per call site.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Attempts `request` once. On timeout, transport failure, or a response
    /// that fails `validate_response`, returns the result of `fallback`
    /// tagged with the reason instead of propagating an error — this
    /// component never surfaces an `Err` to its caller (§4.5: "the LLM
    /// Client never fails outright; it always produces usable text").
    pub async fn generate(
        &self,
        request: LlmRequest,
        fallback: impl FnOnce(FallbackReason) -> String,
    ) -> LlmOutcome {
        let attempt = tokio::time::timeout(self.timeout, self.port.generate(request));

        match attempt.await {
            Ok(Ok(response)) => match validate_response(&response) {
                Ok(()) => LlmOutcome {
                    text: response.text,
                    token_count: response.token_count,
                    used_fallback: false,
                    fallback_reason: None,
                },
                Err(reason) => {
                    warn!(?reason, "llm response failed validation, using fallback");
                    fallback_outcome(reason, fallback)
                }
            },
            Ok(Err(err)) => {
                let reason = match err {
                    LlmError::TimedOut => FallbackReason::LlmTimeout,
                    LlmError::RequestFailed(_) => FallbackReason::LlmUnavailable,
                    LlmError::InvalidResponse(_) => FallbackReason::ParseError,
                };
                warn!(%err, ?reason, "llm call failed, using fallback");
                fallback_outcome(reason, fallback)
            }
            Err(_elapsed) => {
                warn!(timeout_ms = self.timeout.as_millis(), "llm call timed out, using fallback");
                fallback_outcome(FallbackReason::LlmTimeout, fallback)
            }
        }
    }
}

fn fallback_outcome(
    reason: FallbackReason,
    fallback: impl FnOnce(FallbackReason) -> String,
) -> LlmOutcome {
    let text = fallback(reason);
    LlmOutcome {
        token_count: 0,
        used_fallback: true,
        fallback_reason: Some(reason),
        text,
    }
}

/// Rejects empty or whitespace-only completions; everything else the model
/// returns is accepted as-is (the caller, not this layer, knows what shape
/// of JSON/text it expects back).
fn validate_response(response: &LlmResponse) -> Result<(), FallbackReason> {
    if response.text.trim().is_empty() {
        return Err(FallbackReason::ParseError);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct AlwaysOk;
    #[async_trait]
    impl LlmPort for AlwaysOk {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            Ok(LlmResponse {
                text: "hello".into(),
                token_count: 3,
            })
        }
    }

    struct AlwaysFails;
    #[async_trait]
    impl LlmPort for AlwaysFails {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            Err(LlmError::RequestFailed("connection refused".into()))
        }
    }

    struct NeverReturns;
    #[async_trait]
    impl LlmPort for NeverReturns {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            unreachable!()
        }
    }

    fn req() -> LlmRequest {
        LlmRequest {
            system_prompt: None,
            prompt: "hi".into(),
            model: "llama3".into(),
            temperature: 0.7,
            max_tokens: 100,
            seed: 1,
        }
    }

    #[tokio::test]
    async fn successful_call_does_not_invoke_fallback() {
        let client = LlmClient::new(Arc::new(AlwaysOk), "test-model");
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();
        let outcome = client
            .generate(req(), |_| {
                called_clone.store(true, Ordering::SeqCst);
                "fallback".into()
            })
            .await;
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.text, "hello");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn transport_failure_falls_back_with_unavailable_reason() {
        let client = LlmClient::new(Arc::new(AlwaysFails), "test-model");
        let outcome = client.generate(req(), |_| "canned".into()).await;
        assert!(outcome.used_fallback);
        assert_eq!(outcome.fallback_reason, Some(FallbackReason::LlmUnavailable));
        assert_eq!(outcome.text, "canned");
    }

    #[tokio::test]
    async fn slow_call_times_out_on_first_attempt_no_retry() {
        let client = LlmClient::with_timeout(Arc::new(NeverReturns), "test-model", Duration::from_millis(20));
        let outcome = client.generate(req(), |_| "canned".into()).await;
        assert!(outcome.used_fallback);
        assert_eq!(outcome.fallback_reason, Some(FallbackReason::LlmTimeout));
    }
}
