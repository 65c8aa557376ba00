//! Fallback Logger (§4.6). Process-wide, owned by the session (no
//! singleton — §9 Design Notes: "Give them an explicit owner... passed by
//! reference into every subsystem").

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use wrldbldr_domain::{event_kind, DomainEvent};

use crate::error::FallbackReason;

const RING_BUFFER_CAPACITY: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub subsystem: String,
    pub operation: String,
    pub reason: FallbackReason,
    pub prompt_len: usize,
    pub fallback_text: String,
    pub context: serde_json::Value,
    pub frame: u64,
    pub unix_millis: u128,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Truncates `text` to at most `max_chars` characters at a `char` boundary.
fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Default)]
pub struct FallbackLogger {
    counters: HashMap<(String, FallbackReason), u64>,
    ring: VecDeque<FallbackEntry>,
    first_at: Option<u128>,
    last_at: Option<u128>,
}

impl FallbackLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fallback use and returns the `fallback:used` event the
    /// caller must publish (§4.6: "Every logFallback also publishes a
    /// fallback:used event").
    pub fn log(
        &mut self,
        frame: u64,
        subsystem: impl Into<String>,
        operation: impl Into<String>,
        reason: FallbackReason,
        prompt_len: usize,
        fallback_text: &str,
        context: serde_json::Value,
    ) -> DomainEvent {
        let subsystem = subsystem.into();
        let operation = operation.into();
        let truncated = truncate(fallback_text, 280);
        let at = now_millis();
        self.first_at.get_or_insert(at);
        self.last_at = Some(at);

        *self
            .counters
            .entry((subsystem.clone(), reason))
            .or_insert(0) += 1;

        let entry = FallbackEntry {
            subsystem: subsystem.clone(),
            operation: operation.clone(),
            reason,
            prompt_len,
            fallback_text: truncated.clone(),
            context: context.clone(),
            frame,
            unix_millis: at,
        };
        if self.ring.len() >= RING_BUFFER_CAPACITY {
            self.ring.pop_front();
        }
        self.ring.push_back(entry);

        DomainEvent::new(
            frame,
            event_kind::FALLBACK_USED,
            serde_json::json!({
                "subsystem": subsystem,
                "operation": operation,
                "reason": reason.as_str(),
                "promptLength": prompt_len,
                "fallbackText": truncated,
                "context": context,
            }),
            None,
        )
    }

    pub fn count_for(&self, subsystem: &str, reason: FallbackReason) -> u64 {
        *self
            .counters
            .get(&(subsystem.to_string(), reason))
            .unwrap_or(&0)
    }

    pub fn total_count(&self) -> u64 {
        self.counters.values().sum()
    }

    pub fn recent(&self, n: usize) -> Vec<&FallbackEntry> {
        self.ring.iter().rev().take(n).collect()
    }

    /// Fallbacks within the last `window_ms` milliseconds, as a rate
    /// (events per second).
    pub fn rate_per_second(&self, window_ms: u128) -> f64 {
        let now = now_millis();
        let count = self
            .ring
            .iter()
            .filter(|e| now.saturating_sub(e.unix_millis) <= window_ms)
            .count();
        if window_ms == 0 {
            return 0.0;
        }
        count as f64 / (window_ms as f64 / 1000.0)
    }

    pub fn first_and_last(&self) -> (Option<u128>, Option<u128>) {
        (self.first_at, self.last_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_increments_the_right_subsystem_reason_counter() {
        let mut logger = FallbackLogger::new();
        let event = logger.log(
            5,
            "DialogueSubsystem",
            "greeting",
            FallbackReason::LlmUnavailable,
            42,
            "Hello there, traveler.",
            serde_json::json!({"npc": "Gareth"}),
        );
        assert_eq!(event.kind, event_kind::FALLBACK_USED);
        assert_eq!(
            logger.count_for("DialogueSubsystem", FallbackReason::LlmUnavailable),
            1
        );
        assert_eq!(logger.total_count(), 1);
    }

    #[test]
    fn ring_buffer_is_bounded() {
        let mut logger = FallbackLogger::new();
        for i in 0..(RING_BUFFER_CAPACITY + 20) {
            logger.log(
                i as u64,
                "X",
                "op",
                FallbackReason::ParseError,
                1,
                "x",
                serde_json::json!({}),
            );
        }
        assert_eq!(logger.recent(usize::MAX).len(), RING_BUFFER_CAPACITY);
    }

    #[test]
    fn long_fallback_text_is_truncated() {
        let mut logger = FallbackLogger::new();
        let long_text = "a".repeat(1000);
        let event = logger.log(
            0,
            "X",
            "op",
            FallbackReason::LlmTimeout,
            10,
            &long_text,
            serde_json::json!({}),
        );
        let stored = event.payload["fallbackText"].as_str().unwrap();
        assert!(stored.len() <= 280);
    }
}
