//! World state aggregate (§3 Data Model — World state).
//!
//! Holds every entity by id in a flat map, exactly as the teacher's
//! graph-first design stores relationships by id rather than by embedded
//! reference (§9 Design Notes: "Resolve by storing ids only; the session
//! owns the id→record maps"). `World` is the only place that can move a
//! character between locations, because doing so touches two aggregates at
//! once (the old and new location's presence sets).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::clock::GameClock;
use crate::combat::CombatEncounter;
use crate::conversation::Conversation;
use crate::error::DomainError;
use crate::ids::{CharacterId, CombatId, ConversationId, LocationId, QuestId};
use crate::location::Location;
use crate::quest::{Quest, QuestState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    pub protagonist_id: CharacterId,
    characters: HashMap<CharacterId, Character>,
    locations: HashMap<LocationId, Location>,
    quests: HashMap<QuestId, Quest>,
    conversations: HashMap<ConversationId, Conversation>,
    combats: HashMap<CombatId, CombatEncounter>,
    pub clock: GameClock,
    pub rumor_log: Vec<String>,
}

impl World {
    pub fn new(protagonist_id: CharacterId) -> Self {
        Self {
            protagonist_id,
            characters: HashMap::new(),
            locations: HashMap::new(),
            quests: HashMap::new(),
            conversations: HashMap::new(),
            combats: HashMap::new(),
            clock: GameClock::default(),
            rumor_log: Vec::new(),
        }
    }

    // --- Characters -----------------------------------------------------

    pub fn insert_character(&mut self, character: Character) {
        let location = character.current_location;
        let id = character.id();
        self.characters.insert(id, character);
        if let Some(loc) = self.locations.get_mut(&location) {
            loc.add_presence(id);
        }
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn protagonist(&self) -> &Character {
        self.characters
            .get(&self.protagonist_id)
            .expect("protagonist is always present once the world is bootstrapped")
    }

    pub fn protagonist_mut(&mut self) -> &mut Character {
        self.characters
            .get_mut(&self.protagonist_id)
            .expect("protagonist is always present once the world is bootstrapped")
    }

    /// Moves `character_id` to `destination`, keeping both locations'
    /// presence sets and `current_location` in lockstep (§3 invariant).
    pub fn move_character(
        &mut self,
        character_id: CharacterId,
        destination: LocationId,
    ) -> Result<(), DomainError> {
        if !self.locations.contains_key(&destination) {
            return Err(DomainError::not_found("Location", destination.to_string()));
        }
        let old_location = {
            let character = self
                .characters
                .get(&character_id)
                .ok_or_else(|| DomainError::not_found("Character", character_id.to_string()))?;
            character.current_location
        };
        if let Some(loc) = self.locations.get_mut(&old_location) {
            loc.remove_presence(character_id);
        }
        if let Some(loc) = self.locations.get_mut(&destination) {
            loc.add_presence(character_id);
        }
        if let Some(character) = self.characters.get_mut(&character_id) {
            character.current_location = destination;
        }
        Ok(())
    }

    // --- Locations -------------------------------------------------------

    pub fn insert_location(&mut self, location: Location) {
        self.locations.insert(location.id(), location);
    }

    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    pub fn location_mut(&mut self, id: LocationId) -> Option<&mut Location> {
        self.locations.get_mut(&id)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// Links `parent` and `child` as an ordered parent/child pair, keeping
    /// both sides of the relationship consistent (§3 invariant).
    pub fn link_parent_child(&mut self, parent: LocationId, child: LocationId) {
        if let Some(loc) = self.locations.get_mut(&child) {
            loc.parent_id = Some(parent);
        }
        if let Some(loc) = self.locations.get_mut(&parent) {
            loc.add_child(child);
        }
    }

    // --- Quests ------------------------------------------------------------

    pub fn insert_quest(&mut self, quest: Quest) {
        self.quests.insert(quest.id(), quest);
    }

    pub fn quest(&self, id: QuestId) -> Option<&Quest> {
        self.quests.get(&id)
    }

    pub fn quest_mut(&mut self, id: QuestId) -> Option<&mut Quest> {
        self.quests.get_mut(&id)
    }

    pub fn quests(&self) -> impl Iterator<Item = &Quest> {
        self.quests.values()
    }

    pub fn active_quests(&self) -> impl Iterator<Item = &Quest> {
        self.quests.values().filter(|q| q.state == QuestState::Active)
    }

    // --- Conversations -----------------------------------------------------

    pub fn insert_conversation(&mut self, conversation: Conversation) -> ConversationId {
        let id = conversation.id();
        self.conversations.insert(id, conversation);
        id
    }

    pub fn conversation(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.get(&id)
    }

    pub fn conversation_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations.get_mut(&id)
    }

    pub fn active_conversations(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.values().filter(|c| c.active)
    }

    // --- Combats -------------------------------------------------------

    pub fn insert_combat(&mut self, combat: CombatEncounter) -> CombatId {
        let id = combat.id();
        self.combats.insert(id, combat);
        id
    }

    pub fn combat(&self, id: CombatId) -> Option<&CombatEncounter> {
        self.combats.get(&id)
    }

    pub fn combat_mut(&mut self, id: CombatId) -> Option<&mut CombatEncounter> {
        self.combats.get_mut(&id)
    }

    // --- Invariant checking (§8 quantified invariants 1-4) -----------------

    /// Checks invariants 1-4 of §8. Returns the first violation found, if any.
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        for character in self.characters.values() {
            let location = self.locations.get(&character.current_location).ok_or_else(|| {
                DomainError::constraint(format!(
                    "character {} has current_location {} which does not exist",
                    character.id(),
                    character.current_location
                ))
            })?;
            if !location.presence().contains(&character.id()) {
                return Err(DomainError::constraint(format!(
                    "character {} is not present in its own current_location {}",
                    character.id(),
                    character.current_location
                )));
            }
        }

        for location in self.locations.values() {
            for &child_id in location.children() {
                let child = self.locations.get(&child_id).ok_or_else(|| {
                    DomainError::constraint(format!("child location {child_id} does not exist"))
                })?;
                if child.parent_id != Some(location.id()) {
                    return Err(DomainError::constraint(format!(
                        "location {} lists child {} but that child's parent_id doesn't point back",
                        location.id(),
                        child_id
                    )));
                }
            }
        }

        for quest in self.quests.values() {
            let all_completed = quest.objectives.iter().all(|o| o.completed);
            if (quest.state == QuestState::Completed) != all_completed {
                return Err(DomainError::constraint(format!(
                    "quest {} state/objectives mismatch",
                    quest.id()
                )));
            }
            let expected_step = quest.first_incomplete().unwrap_or(quest.objectives.len());
            if quest.guidance.current_step != expected_step {
                return Err(DomainError::constraint(format!(
                    "quest {} guidance.current_step out of sync",
                    quest.id()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::CharacterRole;
    use crate::location::{LocationScale, Terrain};

    #[test]
    fn moving_a_character_updates_both_presence_sets() {
        let town = Location::new("Town", LocationScale::Town, Terrain::Flat);
        let forest = Location::new("Forest", LocationScale::Area, Terrain::Forest);
        let (town_id, forest_id) = (town.id(), forest.id());

        let protagonist = Character::new("Aldric", CharacterRole::Protagonist, town_id);
        let pid = protagonist.id();

        let mut world = World::new(pid);
        world.insert_location(town);
        world.insert_location(forest);
        world.insert_character(protagonist);

        world.move_character(pid, forest_id).unwrap();

        assert!(!world.location(town_id).unwrap().presence().contains(&pid));
        assert!(world.location(forest_id).unwrap().presence().contains(&pid));
        assert_eq!(world.character(pid).unwrap().current_location, forest_id);
        world.check_invariants().unwrap();
    }

    #[test]
    fn check_invariants_catches_dangling_current_location() {
        let protagonist = Character::new(
            "Ghost",
            CharacterRole::Protagonist,
            LocationId::new(),
        );
        let pid = protagonist.id();
        let mut world = World::new(pid);
        world.characters.insert(pid, protagonist);
        assert!(world.check_invariants().is_err());
    }

    #[test]
    fn parent_child_linking_is_bidirectional() {
        let parent = Location::new("Region", LocationScale::Region, Terrain::Flat);
        let child = Location::new("Town", LocationScale::Town, Terrain::Flat);
        let (parent_id, child_id) = (parent.id(), child.id());
        let protagonist = Character::new("P", CharacterRole::Protagonist, child_id);
        let mut world = World::new(protagonist.id());
        world.insert_location(parent);
        world.insert_location(child);
        world.insert_character(protagonist);
        world.link_parent_child(parent_id, child_id);
        world.check_invariants().unwrap();
        assert_eq!(world.location(child_id).unwrap().parent_id, Some(parent_id));
        assert!(world.location(parent_id).unwrap().children().contains(&child_id));
    }
}
