//! Location aggregate (§3 Data Model — Location).
//!
//! # Invariants
//!
//! - Parent/child links are mutually consistent (enforced at the `World`
//!   level, see `world.rs`, since a location alone can't see its siblings).
//! - Each character's `current_location` appears in exactly one location's
//!   `presence` set (also a `World`-level invariant).
//! - `detail_level` never downgrades once raised (`expand_detail` is the only
//!   mutator and it takes the max of old/new).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, ItemId, LocationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationScale {
    Room,
    Building,
    Area,
    Town,
    Region,
}

/// Progressive level of generated detail attached to a location. Ordered so
/// `expand_detail` can simply take the max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Sparse,
    Partial,
    Full,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Terrain and ambient tags that affect movement cost and combat chance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentFlags {
    pub indoor: bool,
    pub lit: bool,
    pub safe: bool,
    pub temperature: TemperatureBand,
    pub hazard_tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureBand {
    Freezing,
    Cold,
    #[default]
    Mild,
    Warm,
    Scorching,
}

/// Terrain kind, used by the Action Executor's travel-cost formula (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Flat,
    Forest,
    Mountain,
    Swamp,
}

impl Terrain {
    pub fn movement_multiplier(self) -> f64 {
        match self {
            Terrain::Flat => 1.0,
            Terrain::Forest => 1.5,
            Terrain::Mountain => 2.0,
            Terrain::Swamp => 2.5,
        }
    }
}

/// A rumor with an associated likelihood of being true, held as narrative
/// fuel for dialogue/quest-detection prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rumor {
    pub text: String,
    pub likelihood: f32,
}

/// Structured snippets attached to a location for LLM prompt context
/// (see GLOSSARY: "Narrative fuel").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrativeFuel {
    pub common_knowledge: Vec<String>,
    pub rumors: Vec<Rumor>,
    pub specialist_npc_ids: Vec<CharacterId>,
    pub quest_hooks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    id: LocationId,
    pub name: String,
    pub type_tag: String,
    pub description_sparse: String,
    pub description_partial: String,
    pub description_full: String,
    pub coordinates: Coordinates,
    pub scale: LocationScale,
    pub parent_id: Option<LocationId>,
    children: Vec<LocationId>,
    exits: HashMap<String, LocationId>,
    pub environment: EnvironmentFlags,
    pub terrain: Terrain,
    pub narrative_fuel: NarrativeFuel,
    detail_level: DetailLevel,
    pub discovered: bool,
    pub visited: bool,
    pub grid_width: i32,
    pub grid_height: i32,
    pub items: Vec<ItemId>,
    presence: HashSet<CharacterId>,
}

impl Location {
    pub fn new(name: impl Into<String>, scale: LocationScale, terrain: Terrain) -> Self {
        Self {
            id: LocationId::new(),
            name: name.into(),
            type_tag: String::new(),
            description_sparse: String::new(),
            description_partial: String::new(),
            description_full: String::new(),
            coordinates: Coordinates { x: 0, y: 0, z: 0 },
            scale,
            parent_id: None,
            children: Vec::new(),
            exits: HashMap::new(),
            environment: EnvironmentFlags::default(),
            terrain,
            narrative_fuel: NarrativeFuel::default(),
            detail_level: DetailLevel::Sparse,
            discovered: false,
            visited: false,
            grid_width: 10,
            grid_height: 10,
            items: Vec::new(),
            presence: HashSet::new(),
        }
    }

    pub fn id(&self) -> LocationId {
        self.id
    }

    pub fn children(&self) -> &[LocationId] {
        &self.children
    }

    pub fn add_child(&mut self, child: LocationId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub fn exits(&self) -> &HashMap<String, LocationId> {
        &self.exits
    }

    pub fn add_exit(&mut self, direction: impl Into<String>, target: LocationId) {
        self.exits.insert(direction.into(), target);
    }

    pub fn presence(&self) -> &HashSet<CharacterId> {
        &self.presence
    }

    pub fn add_presence(&mut self, character: CharacterId) {
        self.presence.insert(character);
    }

    pub fn remove_presence(&mut self, character: CharacterId) {
        self.presence.remove(&character);
    }

    pub fn detail_level(&self) -> DetailLevel {
        self.detail_level
    }

    /// Raises the detail level, never downgrading it (§3 invariant).
    pub fn expand_detail(&mut self, new_level: DetailLevel) {
        if new_level > self.detail_level {
            self.detail_level = new_level;
        }
    }

    /// The description text appropriate to the current detail level.
    pub fn description(&self) -> &str {
        match self.detail_level {
            DetailLevel::Sparse => &self.description_sparse,
            DetailLevel::Partial => &self.description_partial,
            DetailLevel::Full => &self.description_full,
        }
    }

    pub fn mark_discovered(&mut self) {
        self.discovered = true;
    }

    pub fn mark_visited(&mut self) {
        self.visited = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_level_never_downgrades() {
        let mut loc = Location::new("Dark Forest", LocationScale::Area, Terrain::Forest);
        loc.expand_detail(DetailLevel::Full);
        loc.expand_detail(DetailLevel::Sparse);
        assert_eq!(loc.detail_level(), DetailLevel::Full);
    }

    #[test]
    fn presence_add_remove_round_trips() {
        let mut loc = Location::new("Town Square", LocationScale::Area, Terrain::Flat);
        let npc = CharacterId::new();
        loc.add_presence(npc);
        assert!(loc.presence().contains(&npc));
        loc.remove_presence(npc);
        assert!(!loc.presence().contains(&npc));
    }

    #[test]
    fn terrain_multipliers_match_spec_table() {
        assert_eq!(Terrain::Flat.movement_multiplier(), 1.0);
        assert_eq!(Terrain::Forest.movement_multiplier(), 1.5);
        assert_eq!(Terrain::Mountain.movement_multiplier(), 2.0);
        assert_eq!(Terrain::Swamp.movement_multiplier(), 2.5);
    }
}
