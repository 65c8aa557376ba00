//! The `StateSnapshot` value returned by `GameService::get_game_state` (§6):
//! a plain-data summary with no engine references, safe to hand to a
//! front-end or serialize directly to JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wrldbldr_domain::{
    Character, CharacterId, Conversation, Location, LocationId, Quest, Season, SessionId,
    TimeOfDay, Weather,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSummary {
    pub game_time: u64,
    pub game_time_string: String,
    pub time_of_day: TimeOfDay,
    pub day: u64,
    pub season: Season,
    pub year: u64,
    pub weather: Weather,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharactersSummary {
    pub protagonist: Character,
    pub npcs: Vec<Character>,
    pub at_location: Vec<CharacterId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    pub current: LocationId,
    pub discovered: Vec<LocationId>,
    pub visited: Vec<LocationId>,
    pub database: HashMap<LocationId, Location>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestStats {
    pub active_count: usize,
    pub completed_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestsSummary {
    pub active: Vec<Quest>,
    pub stats: QuestStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueStats {
    pub total_conversations_started: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueSummary {
    pub stats: DialogueStats,
    pub active_conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSummary {
    pub paused: bool,
    pub auto_detect_quests: bool,
    pub real_time_played_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub session_id: SessionId,
    pub seed: u64,
    pub frame: u64,
    pub time: TimeSummary,
    pub characters: CharactersSummary,
    pub location: LocationSummary,
    pub quests: QuestsSummary,
    pub dialogue: DialogueSummary,
    pub system: SystemSummary,
}
