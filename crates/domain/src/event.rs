//! Domain events published on the Event Bus and mirrored into the replay log
//! (§4.4, §6 predefined event-type tags).
//!
//! Each variant's `kind()` returns the exact wire string from §6 so the State
//! Publisher, Replay Logger, and any observer can all agree on one spelling
//! without restating it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{CharacterId, CombatId, ConversationId, LocationId, QuestId};

/// A single immutable fact published during a tick. `payload` carries the
/// event-specific data as permissive JSON so new fields can be added without
/// breaking older replay files (§4.3: "unknown fields are preserved verbatim
/// for forward compatibility").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub frame: u64,
    pub kind: String,
    pub payload: Value,
    pub actor: Option<CharacterId>,
}

impl DomainEvent {
    pub fn new(frame: u64, kind: impl Into<String>, payload: Value, actor: Option<CharacterId>) -> Self {
        Self {
            frame,
            kind: kind.into(),
            payload,
            actor,
        }
    }
}

/// Fixed-spelling event-kind tags, exactly as listed in §6.
pub mod kind {
    pub const FRAME_UPDATE: &str = "frame_update";
    pub const ACTION_EXECUTED: &str = "action_executed";
    pub const DIALOGUE_STARTED: &str = "dialogue_started";
    pub const DIALOGUE_TURN: &str = "dialogue_turn";
    pub const DIALOGUE_LINE: &str = "dialogue_line";
    pub const DIALOGUE_ENDED: &str = "dialogue_ended";
    pub const COMBAT_STARTED: &str = "combat_started";
    pub const COMBAT_TURN: &str = "combat_turn";
    pub const COMBAT_ENDED: &str = "combat_ended";
    pub const QUEST_CREATED: &str = "quest_created";
    pub const QUEST_UPDATED: &str = "quest_updated";
    pub const QUEST_OBJECTIVE_COMPLETED: &str = "quest_objective_completed";
    pub const QUEST_COMPLETED: &str = "quest_completed";
    pub const LOCATION_DISCOVERED: &str = "location_discovered";
    pub const LOCATION_CHANGED: &str = "location_changed";
    pub const CHARACTER_DIED: &str = "character_died";
    pub const PAUSE_TOGGLED: &str = "pause_toggled";
    pub const GAME_STARTED: &str = "game_started";
    pub const GAME_ENDED: &str = "game_ended";
    pub const TIME_CHANGED: &str = "time_changed";
    pub const GOLD_CHANGED: &str = "gold_changed";
    pub const LOOT_OBTAINED: &str = "loot_obtained";
    pub const LEVEL_UP: &str = "level_up";
    pub const FALLBACK_USED: &str = "fallback:used";
    pub const ERROR: &str = "error";
}

/// Strongly-typed identifiers referenced from event payloads, kept here so
/// downstream crates can build payloads without hand-writing JSON keys for
/// the common cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestObjectiveRef {
    pub quest_id: QuestId,
    pub objective_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueRef {
    pub conversation_id: ConversationId,
    pub npc_id: Option<CharacterId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatRef {
    pub combat_id: CombatId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRef {
    pub location_id: LocationId,
}
