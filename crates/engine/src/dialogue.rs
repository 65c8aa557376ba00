//! Dialogue Subsystem (§4.7): starts and drives conversations, assembles the
//! per-turn LLM context, enforces the round-robin speaking order, and
//! applies relationship deltas when a conversation ends.

use wrldbldr_domain::{
    event_kind, Character, CharacterId, Conversation, ConversationId, DomainEvent, MemoryKind,
    MemoryRecord, Quest, World,
};

use crate::error::FallbackReason;
use crate::event_bus::EventBus;
use crate::fallback::FallbackLogger;
use crate::llm::{LlmClient, LlmRequest};
use crate::rng::{DeterministicRng, RngStream};

/// Default number of past turns folded into the next prompt's context
/// (§4.7: "recent history, default N=6").
pub const DEFAULT_HISTORY_WINDOW: usize = 6;

const GROUP_RELATIONSHIP_DELTA: f32 = 0.5;
const ONE_ON_ONE_RELATIONSHIP_DELTA: f32 = 1.0;

pub struct DialogueSubsystem {
    history_window: usize,
}

impl Default for DialogueSubsystem {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl DialogueSubsystem {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Begins a conversation among `participants` (must have at least two),
    /// stores it in `world`, and publishes `dialogue_started`.
    pub fn start(
        &self,
        world: &mut World,
        bus: &mut EventBus,
        participants: Vec<CharacterId>,
        frame: u64,
    ) -> Result<ConversationId, crate::error::UserInputError> {
        if participants.len() < 2 {
            return Err(crate::error::UserInputError::NotEnoughParticipants);
        }
        let conversation = Conversation::new(participants.clone(), frame);
        let id = world.insert_conversation(conversation);
        bus.publish(DomainEvent::new(
            frame,
            event_kind::DIALOGUE_STARTED,
            serde_json::json!({
                "conversationId": id,
                "participants": participants,
                "group": participants.len() > 2,
            }),
            participants.first().copied(),
        ));
        Ok(id)
    }

    /// Assembles context for `speaker`'s next line, calls the LLM (falling
    /// back to a canned greeting on failure, never aborting the
    /// conversation — §4.7), records the turn, and publishes
    /// `dialogue_turn`/`dialogue_line`.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_turn(
        &self,
        world: &mut World,
        bus: &mut EventBus,
        llm: &LlmClient,
        fallback_log: &mut FallbackLogger,
        rng: &mut DeterministicRng,
        conversation_id: ConversationId,
        speaker: CharacterId,
        frame: u64,
        call_counter: u64,
    ) -> Result<String, crate::error::UserInputError> {
        let prompt = {
            let conversation = world
                .conversation(conversation_id)
                .ok_or_else(|| crate::error::UserInputError::TargetNotFound(conversation_id.to_string()))?;
            if conversation.has_spoken_last_two_turns(speaker) {
                return Err(crate::error::UserInputError::NotAllowed(
                    "speaker has already taken the last two turns".into(),
                ));
            }
            build_prompt(world, conversation, speaker, self.history_window)
        };

        let seed = rng.llm_call_seed(call_counter);
        let outcome = llm
            .generate(
                LlmRequest {
                    system_prompt: Some(
                        "You are role-playing a character in a text adventure. Reply with a single in-character line of dialogue.".into(),
                    ),
                    prompt,
                    model: llm.model().to_string(),
                    temperature: 0.8,
                    max_tokens: 120,
                    seed,
                },
                |reason| canned_line(reason),
            )
            .await;

        if outcome.used_fallback {
            let reason = outcome.fallback_reason.unwrap_or(FallbackReason::LlmError);
            let event = fallback_log.log(
                frame,
                "DialogueSubsystem",
                "add_turn",
                reason,
                0,
                &outcome.text,
                serde_json::json!({"conversationId": conversation_id, "speaker": speaker}),
            );
            bus.publish(event);
        }

        let line = outcome.text;
        let conversation = world
            .conversation_mut(conversation_id)
            .ok_or_else(|| crate::error::UserInputError::TargetNotFound(conversation_id.to_string()))?;
        conversation.add_turn(speaker, line.clone(), frame);
        let participants = conversation.participants.clone();
        let group = conversation.group;

        bus.publish(DomainEvent::new(
            frame,
            event_kind::DIALOGUE_TURN,
            serde_json::json!({"conversationId": conversation_id, "speaker": speaker}),
            Some(speaker),
        ));
        bus.publish(DomainEvent::new(
            frame,
            event_kind::DIALOGUE_LINE,
            serde_json::json!({"conversationId": conversation_id, "speaker": speaker, "text": line}),
            Some(speaker),
        ));

        apply_relationship_deltas(world, &participants, speaker, group);
        let _ = rng.gen_f64(RngStream::Dialogue); // reserved draw for future tie-break use

        Ok(line)
    }

    /// Picks who should speak next: the eligible participant (not on a
    /// two-turn streak) with the smallest turn count, ties broken by lowest
    /// participant index.
    pub fn suggest_next_speaker(&self, world: &World, conversation_id: ConversationId) -> Option<CharacterId> {
        let conversation = world.conversation(conversation_id)?;
        if conversation.history().is_empty() {
            return conversation.participants.first().copied();
        }
        conversation
            .turn_counts()
            .into_iter()
            .enumerate()
            .filter(|(_, (candidate, _))| !conversation.has_spoken_last_two_turns(*candidate))
            .min_by_key(|(index, (_, count))| (*count, *index))
            .map(|(_, (candidate, _))| candidate)
    }

    /// Ends the conversation, records a memory of it for every participant,
    /// and publishes `dialogue_ended`.
    pub fn end(&self, world: &mut World, bus: &mut EventBus, conversation_id: ConversationId, frame: u64) {
        let Some(conversation) = world.conversation_mut(conversation_id) else {
            return;
        };
        conversation.end();
        let participants = conversation.participants.clone();
        let turn_count = conversation.history().len();

        for participant in &participants {
            if let Some(character) = world.character_mut(*participant) {
                character.remember(MemoryRecord {
                    kind: MemoryKind::Conversation,
                    text: format!("A conversation with {} others ended.", participants.len() - 1),
                    importance: if turn_count > 4 { 6 } else { 3 },
                    frame,
                });
            }
        }

        bus.publish(DomainEvent::new(
            frame,
            event_kind::DIALOGUE_ENDED,
            serde_json::json!({"conversationId": conversation_id, "turnCount": turn_count}),
            None,
        ));
    }
}

fn apply_relationship_deltas(
    world: &mut World,
    participants: &[CharacterId],
    speaker: CharacterId,
    group: bool,
) {
    let delta = if group {
        GROUP_RELATIONSHIP_DELTA
    } else {
        ONE_ON_ONE_RELATIONSHIP_DELTA
    };
    for &other in participants {
        if other == speaker {
            continue;
        }
        if let Some(character) = world.character_mut(other) {
            character.adjust_relationship(speaker, delta);
        }
        if let Some(character) = world.character_mut(speaker) {
            character.adjust_relationship(other, delta);
        }
    }
}

fn build_prompt(world: &World, conversation: &Conversation, speaker: CharacterId, window: usize) -> String {
    let mut lines = Vec::new();
    if let Some(character) = world.character(speaker) {
        lines.push(character_identity_block(character));
        lines.push(relevant_knowledge_block(world, character, conversation));
        lines.push(relevant_quests_block(world, speaker));
    }
    lines.push(format!(
        "Time: {} ({:?}), weather: {:?}.",
        world.clock.as_hh_mm(),
        world.clock.time_of_day,
        world.clock.weather
    ));
    if !world.rumor_log.is_empty() {
        lines.push(format!("Rumors heard recently: {}", world.rumor_log.join("; ")));
    }

    lines.push("Recent conversation:".to_string());
    let history = conversation.history();
    let start = history.len().saturating_sub(window);
    for turn in &history[start..] {
        let name = world
            .character(turn.speaker)
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| turn.speaker.to_string());
        lines.push(format!("{name}: {}", turn.text));
    }
    lines.join("\n")
}

fn character_identity_block(character: &Character) -> String {
    format!(
        "You are {}, mood: {}, concern: {}.",
        character.display_name,
        character.mood,
        character.concern.clone().unwrap_or_else(|| "none".into())
    )
}

fn relevant_knowledge_block(world: &World, character: &Character, conversation: &Conversation) -> String {
    let topic_hints = conversation.topic_hints.join(" ");
    let mut known = Vec::new();
    for specialty in &character.knowledge.specialties {
        if topic_hints.is_empty() || character.knowledge.is_specialist_for(&topic_hints) {
            known.push(specialty.clone());
        }
    }
    known.extend(character.knowledge.rumors.iter().cloned());
    let _ = world; // knowledge block is self-contained on the character today
    if known.is_empty() {
        "Knowledge: nothing notable.".to_string()
    } else {
        format!("Knowledge: {}", known.join("; "))
    }
}

fn relevant_quests_block(world: &World, speaker: CharacterId) -> String {
    let relevant: Vec<&Quest> = world
        .active_quests()
        .filter(|q| q.giver == speaker)
        .collect();
    if relevant.is_empty() {
        "Active quests involving you: none.".to_string()
    } else {
        let titles: Vec<&str> = relevant.iter().map(|q| q.title.as_str()).collect();
        format!("Active quests involving you: {}", titles.join(", "))
    }
}

fn canned_line(reason: FallbackReason) -> String {
    match reason {
        FallbackReason::LlmTimeout | FallbackReason::LlmUnavailable => {
            "\"...\" they say, distracted, and wave you off for a moment.".to_string()
        }
        FallbackReason::LlmError | FallbackReason::ParseError => {
            "They nod slowly but don't say anything further.".to_string()
        }
    }
}
