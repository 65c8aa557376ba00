//! Autonomous Decider (§4.11): each frame, decides what the protagonist does
//! next. Calls the LLM for a structured `{actionType, target, reason}`
//! decision; on two consecutive failures to produce a valid one, falls back
//! to a fixed heuristic rather than stalling the loop.

use wrldbldr_domain::{CharacterId, LocationId, World};

use crate::error::FallbackReason;
use crate::fallback::FallbackLogger;
use crate::llm::{LlmClient, LlmRequest};
use crate::rng::DeterministicRng;

#[derive(Debug, Clone, PartialEq)]
pub enum DecidedAction {
    Travel { destination: LocationId },
    Talk { npc: CharacterId },
    Rest,
}

pub struct Decider {
    consecutive_invalid_decisions: u32,
}

impl Default for Decider {
    fn default() -> Self {
        Self {
            consecutive_invalid_decisions: 0,
        }
    }
}

impl Decider {
    /// Asks the LLM what the protagonist should do. After two consecutive
    /// responses that don't parse into a `DecidedAction`, stops asking and
    /// returns the heuristic fallback directly — no third attempt (§4.11:
    /// "two-strikes-then-heuristic-fallback").
    #[allow(clippy::too_many_arguments)]
    pub async fn decide(
        &mut self,
        world: &World,
        llm: &LlmClient,
        fallback_log: &mut FallbackLogger,
        rng: &mut DeterministicRng,
        frame: u64,
        call_counter: u64,
    ) -> DecidedAction {
        if self.consecutive_invalid_decisions >= 2 {
            self.consecutive_invalid_decisions = 0;
            return heuristic_fallback(world);
        }

        let prompt = build_decision_prompt(world);
        let seed = rng.llm_call_seed(call_counter);
        let outcome = llm
            .generate(
                LlmRequest {
                    system_prompt: Some(
                        "Decide the protagonist's next action. Reply with JSON: {\"actionType\": \"travel\"|\"talk\"|\"rest\", \"target\": \"<uuid or empty>\", \"reason\": string}.".into(),
                    ),
                    prompt,
                    model: llm.model().to_string(),
                    temperature: 0.5,
                    max_tokens: 150,
                    seed,
                },
                |_| "{\"actionType\": \"rest\", \"target\": \"\", \"reason\": \"fallback\"}".to_string(),
            )
            .await;

        if outcome.used_fallback {
            let reason = outcome.fallback_reason.unwrap_or(FallbackReason::LlmError);
            fallback_log.log(
                frame,
                "Decider",
                "decide",
                reason,
                0,
                &outcome.text,
                serde_json::json!({}),
            );
            self.consecutive_invalid_decisions += 1;
            return heuristic_fallback(world);
        }

        match parse_decision(world, &outcome.text) {
            Some(action) => {
                self.consecutive_invalid_decisions = 0;
                action
            }
            None => {
                self.consecutive_invalid_decisions += 1;
                heuristic_fallback(world)
            }
        }
    }
}

fn build_decision_prompt(world: &World) -> String {
    let protagonist = world.protagonist();
    let quest_hint = world
        .active_quests()
        .next()
        .map(|q| format!("Active quest: {} — {}", q.title, q.guidance.hints.join("; ")))
        .unwrap_or_else(|| "No active quests.".to_string());
    format!(
        "Protagonist {} is at health {}/{}, location {}. {}",
        protagonist.display_name,
        protagonist.stats.hp.current(),
        protagonist.stats.hp.max(),
        protagonist.current_location,
        quest_hint,
    )
}

fn parse_decision(world: &World, text: &str) -> Option<DecidedAction> {
    let parsed: serde_json::Value = serde_json::from_str(text).ok()?;
    let action_type = parsed.get("actionType")?.as_str()?;
    let target = parsed.get("target").and_then(|v| v.as_str()).unwrap_or("");

    match action_type {
        "travel" => {
            let uuid = uuid::Uuid::parse_str(target).ok()?;
            let destination = LocationId::from_uuid(uuid);
            world.location(destination)?;
            Some(DecidedAction::Travel { destination })
        }
        "talk" => {
            let uuid = uuid::Uuid::parse_str(target).ok()?;
            let npc = CharacterId::from_uuid(uuid);
            world.character(npc)?;
            Some(DecidedAction::Talk { npc })
        }
        "rest" => Some(DecidedAction::Rest),
        _ => None,
    }
}

/// Travel toward the next quest location if any, else talk to a nearby NPC,
/// else rest (§4.11 exact fallback order).
fn heuristic_fallback(world: &World) -> DecidedAction {
    if let Some(quest) = world.active_quests().next() {
        if let Some(destination) = quest.guidance.next_location {
            return DecidedAction::Travel { destination };
        }
        if let Some(npc) = quest.guidance.next_npc {
            return DecidedAction::Talk { npc };
        }
    }
    let protagonist = world.protagonist();
    if let Some(location) = world.location(protagonist.current_location) {
        for &npc_id in location.presence() {
            if npc_id != protagonist.id() {
                return DecidedAction::Talk { npc: npc_id };
            }
        }
    }
    DecidedAction::Rest
}
