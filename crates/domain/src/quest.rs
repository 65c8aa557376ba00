//! Quest aggregate (§3 Data Model — Quest).
//!
//! # Invariants
//!
//! - `state == Completed` iff every objective is completed.
//! - `guidance.current_step` points at the first incomplete objective, or
//!   equals `objectives.len()` when none remain.

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, ItemId, LocationId, ObjectiveId, QuestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveType {
    Talk,
    Visit,
    Learn,
    Collect,
    Defeat,
    Escort,
    Deliver,
}

/// What an objective is checked against. Which variant is meaningful depends
/// on `ObjectiveType` (talk/visit/defeat check an id, learn checks keywords,
/// collect/deliver check an item id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObjectiveTarget {
    Character(CharacterId),
    Location(LocationId),
    Item(ItemId),
    Keywords(Vec<String>),
    EnemyType(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub id: ObjectiveId,
    pub description: String,
    pub kind: ObjectiveType,
    pub target: ObjectiveTarget,
    pub completed: bool,
}

impl Objective {
    pub fn new(description: impl Into<String>, kind: ObjectiveType, target: ObjectiveTarget) -> Self {
        Self {
            id: ObjectiveId::new(),
            description: description.into(),
            kind,
            target,
            completed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestState {
    Active,
    Completed,
    Failed,
}

/// Points the player toward what to do next, recomputed every time an
/// objective completes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Guidance {
    pub current_step: usize,
    pub next_location: Option<LocationId>,
    pub next_npc: Option<CharacterId>,
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestRewards {
    pub gold: u32,
    pub experience: u32,
    pub items: Vec<ItemId>,
    pub narrative: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestMetadata {
    pub confidence: u8,
    pub urgency: u8,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    id: QuestId,
    pub title: String,
    pub description: String,
    pub giver: CharacterId,
    pub quest_type: String,
    pub objectives: Vec<Objective>,
    pub state: QuestState,
    pub guidance: Guidance,
    pub rewards: QuestRewards,
    pub metadata: QuestMetadata,
}

impl Quest {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        giver: CharacterId,
        quest_type: impl Into<String>,
        objectives: Vec<Objective>,
    ) -> Self {
        let mut quest = Self {
            id: QuestId::new(),
            title: title.into(),
            description: description.into(),
            giver,
            quest_type: quest_type.into(),
            objectives,
            state: QuestState::Active,
            guidance: Guidance::default(),
            rewards: QuestRewards::default(),
            metadata: QuestMetadata::default(),
        };
        quest.recompute_guidance();
        quest
    }

    pub fn id(&self) -> QuestId {
        self.id
    }

    /// Index of the first incomplete objective, the quest's invariant.
    pub fn first_incomplete(&self) -> Option<usize> {
        self.objectives.iter().position(|o| !o.completed)
    }

    /// Marks the objective at `index` complete and recomputes `guidance` and
    /// `state`. Returns `true` if the quest just transitioned to Completed.
    pub fn complete_objective(&mut self, index: usize) -> bool {
        if let Some(obj) = self.objectives.get_mut(index) {
            obj.completed = true;
        }
        self.recompute_guidance();
        if self.objectives.iter().all(|o| o.completed) {
            self.state = QuestState::Completed;
            true
        } else {
            false
        }
    }

    fn recompute_guidance(&mut self) {
        self.guidance.current_step = self.first_incomplete().unwrap_or(self.objectives.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quest() -> Quest {
        let giver = CharacterId::new();
        Quest::new(
            "Find the missing grain",
            "Gareth's cellar has gone quiet",
            giver,
            "fetch",
            vec![
                Objective::new(
                    "Talk to Gareth about the missing grain",
                    ObjectiveType::Talk,
                    ObjectiveTarget::Character(giver),
                ),
                Objective::new(
                    "Visit the old mill",
                    ObjectiveType::Visit,
                    ObjectiveTarget::Location(LocationId::new()),
                ),
            ],
        )
    }

    #[test]
    fn guidance_points_at_first_incomplete_objective() {
        let quest = sample_quest();
        assert_eq!(quest.guidance.current_step, 0);
    }

    #[test]
    fn completing_all_objectives_completes_the_quest() {
        let mut quest = sample_quest();
        assert!(!quest.complete_objective(0));
        assert_eq!(quest.guidance.current_step, 1);
        assert!(quest.complete_objective(1));
        assert_eq!(quest.state, QuestState::Completed);
        assert_eq!(quest.guidance.current_step, quest.objectives.len());
    }
}
