//! Replay-mode LLM lookup (§4.15/§6): during `replay play` and
//! `replay continue`, no LLM call is ever allowed to reach a live endpoint —
//! every call is satisfied from the recorded `llmCalls[]` cache, keyed by
//! `(frame, subsystem, seed)`, which is exactly how those calls were logged
//! the first time (§6 replay file schema). Callers that normally go through
//! `LlmClient`/`LlmPort` switch to direct `lookup` calls in replay mode
//! instead, since the cache key needs the subsystem name the `LlmPort`
//! trait's request shape doesn't carry.

use std::collections::HashMap;

use super::ports::LlmResponse;

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub frame: u64,
    pub subsystem: String,
    pub seed: u64,
}

/// An `LlmPort` backed entirely by previously recorded calls. Never performs
/// network I/O; a cache miss is a replay-corruption condition the caller
/// surfaces as `EngineError::Replay`, not something this adapter papers over.
pub struct ReplayLlmClient {
    cache: HashMap<CacheKey, LlmResponse>,
}

impl ReplayLlmClient {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = (CacheKey, LlmResponse)>) -> Self {
        Self {
            cache: records.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, key: CacheKey, response: LlmResponse) {
        self.cache.insert(key, response);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains_key(key)
    }

    /// Looks up a cached response directly, for callers (the Replay
    /// Continuation component) that need to distinguish "not recorded" from
    /// "the LLM Client's own fallback logic kicks in" rather than going
    /// through the `LlmPort` trait's generic error type.
    pub fn lookup(&self, key: &CacheKey) -> Option<&LlmResponse> {
        self.cache.get(key)
    }
}

impl Default for ReplayLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_exact_key() {
        let mut client = ReplayLlmClient::new();
        let key = CacheKey {
            frame: 10,
            subsystem: "DialogueSubsystem".into(),
            seed: 42,
        };
        client.insert(
            key.clone(),
            LlmResponse {
                text: "Greetings.".into(),
                token_count: 2,
            },
        );
        assert!(client.contains(&key));
        assert_eq!(client.lookup(&key).unwrap().text, "Greetings.");
    }

    #[test]
    fn missing_key_is_a_clean_miss_not_a_panic() {
        let client = ReplayLlmClient::new();
        let key = CacheKey {
            frame: 1,
            subsystem: "X".into(),
            seed: 1,
        };
        assert!(!client.contains(&key));
        assert!(client.lookup(&key).is_none());
    }
}
