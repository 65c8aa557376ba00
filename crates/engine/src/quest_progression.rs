//! Quest Progression (§4.8): scans active quests' first incomplete objective
//! against whatever just happened, completes objectives that match, and runs
//! the two-stage pipeline for detecting a brand-new quest out of dialogue.

use wrldbldr_domain::{
    event_kind, CharacterId, DomainEvent, ItemId, LocationId, ObjectiveTarget, Objective,
    ObjectiveType, Quest, QuestId, QuestRewards, World,
};

use crate::error::FallbackReason;
use crate::event_bus::EventBus;
use crate::fallback::FallbackLogger;
use crate::llm::{LlmClient, LlmRequest};
use crate::rng::DeterministicRng;

/// Minimum LLM-reported confidence (0-100) to auto-create a quest proposed
/// out of dialogue (§4.8 two-stage pipeline, stage 2).
pub const QUEST_PROPOSAL_CONFIDENCE_THRESHOLD: u8 = 60;

/// Whether detecting new quests in dialogue should run at all. Kept as a
/// flag rather than gated automatically, so a caller that wants only
/// pre-authored quests can turn the heuristic off entirely.
#[derive(Debug, Clone, Copy)]
pub struct QuestProgressionConfig {
    pub auto_detect_quests: bool,
}

impl Default for QuestProgressionConfig {
    fn default() -> Self {
        Self {
            auto_detect_quests: true,
        }
    }
}

pub struct QuestProgression {
    config: QuestProgressionConfig,
}

impl Default for QuestProgression {
    fn default() -> Self {
        Self {
            config: QuestProgressionConfig::default(),
        }
    }
}

/// What just happened, expressed generically enough to check against any
/// objective type without the caller needing to know quest internals.
pub enum ProgressSignal {
    Talked { speaker: CharacterId, listener: CharacterId, text: String },
    Visited { location: LocationId },
    Defeated { enemy_kind: String },
    Collected { item: ItemId },
    Delivered { item: ItemId, to: CharacterId },
}

impl QuestProgression {
    pub fn new(config: QuestProgressionConfig) -> Self {
        Self { config }
    }

    /// Checks every active quest's first incomplete objective against
    /// `signal`, completing and publishing for any that match. A quest can
    /// only ever progress on its current step (§4.8: "objectives complete in
    /// order; a later one is never satisfied out of sequence").
    pub fn apply_signal(&self, world: &mut World, bus: &mut EventBus, signal: &ProgressSignal, frame: u64) {
        let quest_ids: Vec<QuestId> = world.active_quests().map(|q| q.id()).collect();
        for quest_id in quest_ids {
            let step = {
                let Some(quest) = world.quest(quest_id) else { continue };
                let Some(step) = quest.first_incomplete() else { continue };
                let Some(objective) = quest.objectives.get(step) else { continue };
                if !signal_matches(objective, signal) {
                    continue;
                }
                step
            };
            let Some(quest) = world.quest_mut(quest_id) else { continue };
            let just_completed = quest.complete_objective(step);

            bus.publish(DomainEvent::new(
                frame,
                event_kind::QUEST_OBJECTIVE_COMPLETED,
                serde_json::json!({"questId": quest_id, "objectiveIndex": step}),
                None,
            ));
            bus.publish(DomainEvent::new(
                frame,
                event_kind::QUEST_UPDATED,
                serde_json::json!({"questId": quest_id, "currentStep": quest.guidance.current_step}),
                None,
            ));

            if just_completed {
                bus.publish(DomainEvent::new(
                    frame,
                    event_kind::QUEST_COMPLETED,
                    serde_json::json!({"questId": quest_id}),
                    None,
                ));
                grant_rewards(world, bus, quest_id, frame);
            }
        }
    }

    /// Stage 1 (keyword screen) + stage 2 (LLM confidence proposal) of the
    /// new-quest-detection pipeline. Only runs when dialogue was a plain
    /// `Talked` signal and `auto_detect_quests` is on.
    #[allow(clippy::too_many_arguments)]
    pub async fn maybe_propose_quest(
        &self,
        world: &mut World,
        bus: &mut EventBus,
        llm: &LlmClient,
        fallback_log: &mut FallbackLogger,
        rng: &mut DeterministicRng,
        text: &str,
        giver: CharacterId,
        frame: u64,
        call_counter: u64,
    ) -> Option<QuestId> {
        if !self.config.auto_detect_quests {
            return None;
        }
        if !keyword_screen(text) {
            return None;
        }

        let seed = rng.llm_call_seed(call_counter);
        let outcome = llm
            .generate(
                LlmRequest {
                    system_prompt: Some(
                        "Given this line of dialogue, decide if it proposes a new quest. Reply with JSON: {\"isQuest\": bool, \"confidence\": 0-100, \"title\": string, \"description\": string}.".into(),
                    ),
                    prompt: text.to_string(),
                    model: llm.model().to_string(),
                    temperature: 0.3,
                    max_tokens: 200,
                    seed,
                },
                |_| "{\"isQuest\": false, \"confidence\": 0, \"title\": \"\", \"description\": \"\"}".to_string(),
            )
            .await;

        if outcome.used_fallback {
            let reason = outcome.fallback_reason.unwrap_or(FallbackReason::LlmError);
            let event = fallback_log.log(
                frame,
                "QuestProgression",
                "maybe_propose_quest",
                reason,
                text.len(),
                &outcome.text,
                serde_json::json!({"giver": giver}),
            );
            bus.publish(event);
            return None;
        }

        let parsed: serde_json::Value = serde_json::from_str(&outcome.text).ok()?;
        let is_quest = parsed.get("isQuest")?.as_bool().unwrap_or(false);
        let confidence = parsed.get("confidence")?.as_u64().unwrap_or(0) as u8;
        if !is_quest || confidence < QUEST_PROPOSAL_CONFIDENCE_THRESHOLD {
            return None;
        }
        let title = parsed.get("title").and_then(|v| v.as_str()).unwrap_or("Unnamed task");
        let description = parsed
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let mut quest = Quest::new(
            title,
            description,
            giver,
            "dialogue_detected",
            vec![Objective::new(
                format!("Follow up with {giver}"),
                ObjectiveType::Talk,
                ObjectiveTarget::Character(giver),
            )],
        );
        quest.metadata.confidence = confidence;
        let quest_id = quest.id();
        world.insert_quest(quest);

        bus.publish(DomainEvent::new(
            frame,
            event_kind::QUEST_CREATED,
            serde_json::json!({"questId": quest_id, "title": title, "confidence": confidence}),
            Some(giver),
        ));

        Some(quest_id)
    }
}

/// Grants a completed quest's gold/experience/items to the protagonist,
/// publishing `gold_changed`, `level_up` (iff a threshold is crossed), and
/// `loot_obtained` for each item (§3 `QuestRewards`).
fn grant_rewards(world: &mut World, bus: &mut EventBus, quest_id: QuestId, frame: u64) {
    let Some(quest) = world.quest(quest_id) else { return };
    let rewards: QuestRewards = quest.rewards.clone();
    let protagonist_id = world.protagonist_id;
    let protagonist = world.protagonist_mut();
    protagonist.inventory.add_gold(rewards.gold);
    let new_total = protagonist.inventory.gold();
    let levels_gained = protagonist.gain_experience(rewards.experience);
    let new_level = protagonist.stats.level;

    if rewards.gold > 0 {
        bus.publish(DomainEvent::new(
            frame,
            event_kind::GOLD_CHANGED,
            serde_json::json!({"actor": protagonist_id, "amount": rewards.gold, "newTotal": new_total}),
            Some(protagonist_id),
        ));
    }
    for item in &rewards.items {
        bus.publish(DomainEvent::new(
            frame,
            event_kind::LOOT_OBTAINED,
            serde_json::json!({"actor": protagonist_id, "item": item, "quantity": 1}),
            Some(protagonist_id),
        ));
    }
    if levels_gained > 0 {
        bus.publish(DomainEvent::new(
            frame,
            event_kind::LEVEL_UP,
            serde_json::json!({"actor": protagonist_id, "newLevel": new_level}),
            Some(protagonist_id),
        ));
    }
}

fn signal_matches(objective: &Objective, signal: &ProgressSignal) -> bool {
    match (&objective.kind, &objective.target, signal) {
        (ObjectiveType::Talk, ObjectiveTarget::Character(target), ProgressSignal::Talked { speaker, listener, .. }) => {
            target == speaker || target == listener
        }
        (ObjectiveType::Visit, ObjectiveTarget::Location(target), ProgressSignal::Visited { location }) => {
            target == location
        }
        (ObjectiveType::Defeat, ObjectiveTarget::EnemyType(target), ProgressSignal::Defeated { enemy_kind }) => {
            target.eq_ignore_ascii_case(enemy_kind)
        }
        (ObjectiveType::Collect, ObjectiveTarget::Item(target), ProgressSignal::Collected { item }) => {
            target == item
        }
        (ObjectiveType::Deliver, ObjectiveTarget::Item(target), ProgressSignal::Delivered { item, .. }) => {
            target == item
        }
        (ObjectiveType::Learn, ObjectiveTarget::Keywords(keywords), ProgressSignal::Talked { text, .. }) => {
            let lowered = text.to_ascii_lowercase();
            keywords.iter().any(|k| lowered.contains(&k.to_ascii_lowercase()))
        }
        _ => false,
    }
}

fn keyword_screen(text: &str) -> bool {
    const SIGNAL_WORDS: &[&str] = &["please", "help", "need", "missing", "trouble", "can you", "would you"];
    let lowered = text.to_ascii_lowercase();
    SIGNAL_WORDS.iter().any(|w| lowered.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrldbldr_domain::{Character, CharacterRole, Location, LocationScale, Terrain};

    fn world_with_talk_quest() -> (World, CharacterId, QuestId) {
        let town = Location::new("Town", LocationScale::Town, Terrain::Flat);
        let town_id = town.id();
        let protagonist = Character::new("Aldric", CharacterRole::Protagonist, town_id);
        let gareth = Character::new("Gareth", CharacterRole::Npc, town_id);
        let pid = protagonist.id();
        let gid = gareth.id();
        let mut world = World::new(pid);
        world.insert_location(town);
        world.insert_character(protagonist);
        world.insert_character(gareth);
        let quest = Quest::new(
            "Missing grain",
            "Find out what happened",
            gid,
            "fetch",
            vec![Objective::new(
                "Talk to Gareth",
                ObjectiveType::Talk,
                ObjectiveTarget::Character(gid),
            )],
        );
        let qid = quest.id();
        world.insert_quest(quest);
        (world, gid, qid)
    }

    #[test]
    fn talking_to_the_quest_giver_completes_the_objective() {
        let (mut world, gid, qid) = world_with_talk_quest();
        let mut bus = EventBus::new();
        let progression = QuestProgression::default();
        let signal = ProgressSignal::Talked {
            speaker: gid,
            listener: world.protagonist_id,
            text: "Hello".into(),
        };
        progression.apply_signal(&mut world, &mut bus, &signal, 1);
        assert!(world.quest(qid).unwrap().objectives[0].completed);
        let drained = bus.drain();
        assert!(drained.iter().any(|e| e.kind == event_kind::QUEST_COMPLETED));
    }

    #[test]
    fn keyword_screen_rejects_ordinary_small_talk() {
        assert!(!keyword_screen("Nice weather today, isn't it?"));
        assert!(keyword_screen("Please, can you help me find my goat?"));
    }
}
