//! Combat encounter aggregate (§3 Data Model — Combat encounter).

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, CombatId, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceBand {
    Melee,
    Close,
    Medium,
    Long,
}

impl DistanceBand {
    /// One step toward melee, saturating.
    pub fn closer(self) -> Self {
        match self {
            DistanceBand::Long => DistanceBand::Medium,
            DistanceBand::Medium => DistanceBand::Close,
            DistanceBand::Close | DistanceBand::Melee => DistanceBand::Melee,
        }
    }

    /// One step away from melee, saturating.
    pub fn further(self) -> Self {
        match self {
            DistanceBand::Melee => DistanceBand::Close,
            DistanceBand::Close => DistanceBand::Medium,
            DistanceBand::Medium | DistanceBand::Long => DistanceBand::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InitiativeEntry {
    pub character: CharacterId,
    pub initiative: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    Flee,
    Timeout,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatRewards {
    pub experience: u32,
    pub gold: u32,
    pub items: Vec<ItemId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatLogEntry {
    pub round: u32,
    pub actor: CharacterId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatEncounter {
    id: CombatId,
    pub initiative: Vec<InitiativeEntry>,
    pub positions: HashMap<CharacterId, DistanceBand>,
    /// Combatants who chose `defend` this round; halves incoming damage
    /// until the next `advance_round` clears it.
    pub defending: std::collections::HashSet<CharacterId>,
    pub round: u32,
    pub max_rounds: u32,
    turn_order: VecDeque<CharacterId>,
    pub log: Vec<CombatLogEntry>,
    pub resolved: bool,
    pub outcome: Option<CombatOutcome>,
    pub rewards: CombatRewards,
}

impl CombatEncounter {
    pub fn new(mut initiative: Vec<InitiativeEntry>, max_rounds: u32) -> Self {
        initiative.sort_by(|a, b| b.initiative.cmp(&a.initiative));
        let turn_order = initiative.iter().map(|e| e.character).collect();
        Self {
            id: CombatId::new(),
            initiative,
            positions: HashMap::new(),
            defending: std::collections::HashSet::new(),
            round: 1,
            max_rounds,
            turn_order,
            log: Vec::new(),
            resolved: false,
            outcome: None,
            rewards: CombatRewards::default(),
        }
    }

    pub fn id(&self) -> CombatId {
        self.id
    }

    pub fn next_in_turn_order(&mut self) -> Option<CharacterId> {
        let next = self.turn_order.pop_front()?;
        self.turn_order.push_back(next);
        Some(next)
    }

    pub fn advance_round(&mut self) {
        self.round += 1;
        self.defending.clear();
    }

    pub fn is_at_round_cap(&self) -> bool {
        self.round > self.max_rounds
    }

    pub fn record(&mut self, actor: CharacterId, text: impl Into<String>) {
        self.log.push(CombatLogEntry {
            round: self.round,
            actor,
            text: text.into(),
        });
    }

    pub fn resolve(&mut self, outcome: CombatOutcome, rewards: CombatRewards) {
        self.resolved = true;
        self.outcome = Some(outcome);
        self.rewards = rewards;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_order_is_initiative_descending_and_cycles() {
        let a = CharacterId::new();
        let b = CharacterId::new();
        let mut combat = CombatEncounter::new(
            vec![
                InitiativeEntry {
                    character: a,
                    initiative: 5,
                },
                InitiativeEntry {
                    character: b,
                    initiative: 15,
                },
            ],
            20,
        );
        assert_eq!(combat.next_in_turn_order(), Some(b));
        assert_eq!(combat.next_in_turn_order(), Some(a));
        assert_eq!(combat.next_in_turn_order(), Some(b));
    }

    #[test]
    fn round_cap_behaves_as_a_strict_upper_bound() {
        let mut combat = CombatEncounter::new(vec![], 2);
        assert!(!combat.is_at_round_cap());
        combat.advance_round();
        assert!(!combat.is_at_round_cap());
        combat.advance_round();
        assert!(combat.is_at_round_cap());
    }

    #[test]
    fn distance_band_steps_saturate_at_the_ends() {
        assert_eq!(DistanceBand::Melee.closer(), DistanceBand::Melee);
        assert_eq!(DistanceBand::Long.further(), DistanceBand::Long);
        assert_eq!(DistanceBand::Long.closer(), DistanceBand::Medium);
    }
}
