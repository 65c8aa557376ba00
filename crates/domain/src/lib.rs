//! Core domain types for the autonomous role-playing engine: plain records
//! and the invariants they must satisfy (§3 Data Model). No async, no I/O,
//! no RNG — everything here is pure data and pure functions, so the engine
//! crate can unit test game logic without a runtime or a network endpoint.

pub mod character;
pub mod clock;
pub mod combat;
pub mod conversation;
pub mod error;
pub mod event;
pub mod ids;
pub mod item;
pub mod llm_record;
pub mod location;
pub mod quest;
pub mod world;

pub use character::{
    Ability, Attributes, Character, CharacterRole, Equipment, EquipmentSlot, Inventory,
    InventorySlot, Knowledge, MemoryKind, MemoryRecord, Personality, Resource, Stats,
};
pub use clock::{ClockTransition, GameClock, Season, TimeOfDay, Weather, WEATHER_CHANGE_CHANCE};
pub use combat::{
    CombatEncounter, CombatLogEntry, CombatOutcome, CombatRewards, DistanceBand, InitiativeEntry,
};
pub use conversation::{Conversation, Turn};
pub use error::DomainError;
pub use event::{kind as event_kind, CombatRef, DialogueRef, DomainEvent, LocationRef, QuestObjectiveRef};
pub use ids::{
    AbilityId, CharacterId, CombatId, ConversationId, ItemId, LocationId, ObjectiveId, QuestId,
    SessionId,
};
pub use item::{Item, Rarity};
pub use llm_record::LlmCallRecord;
pub use location::{
    Coordinates, DetailLevel, EnvironmentFlags, Location, LocationScale, NarrativeFuel, Rumor,
    Terrain, TemperatureBand,
};
pub use quest::{Guidance, Objective, ObjectiveTarget, ObjectiveType, Quest, QuestMetadata, QuestRewards, QuestState};
pub use world::World;
