//! Conversation aggregate (§3 Data Model — Conversation).

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, ConversationId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: CharacterId,
    pub text: String,
    pub frame: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    pub participants: Vec<CharacterId>,
    pub start_frame: u64,
    history: Vec<Turn>,
    pub active: bool,
    pub group: bool,
    pub topic_hints: Vec<String>,
}

impl Conversation {
    /// Creates a new conversation. `participants` must have at least two
    /// entries (§8 boundary behavior: a single-participant conversation is
    /// rejected by the caller before this constructor runs).
    pub fn new(participants: Vec<CharacterId>, start_frame: u64) -> Self {
        let group = participants.len() > 2;
        Self {
            id: ConversationId::new(),
            participants,
            start_frame,
            history: Vec::new(),
            active: true,
            group,
            topic_hints: Vec::new(),
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn add_turn(&mut self, speaker: CharacterId, text: impl Into<String>, frame: u64) {
        self.history.push(Turn {
            speaker,
            text: text.into(),
            frame,
        });
    }

    /// How many turns each participant has taken, in participant order.
    pub fn turn_counts(&self) -> Vec<(CharacterId, usize)> {
        self.participants
            .iter()
            .map(|&id| (id, self.history.iter().filter(|t| t.speaker == id).count()))
            .collect()
    }

    /// Whether `speaker` has taken the last two turns (the "no three
    /// consecutive turns" round-robin rule, §4.7).
    pub fn has_spoken_last_two_turns(&self, speaker: CharacterId) -> bool {
        let len = self.history.len();
        if len < 2 {
            return false;
        }
        self.history[len - 1].speaker == speaker && self.history[len - 2].speaker == speaker
    }

    pub fn end(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_participants_is_a_group_conversation() {
        let conv = Conversation::new(
            vec![CharacterId::new(), CharacterId::new(), CharacterId::new()],
            0,
        );
        assert!(conv.group);
    }

    #[test]
    fn detects_two_consecutive_turns_from_same_speaker() {
        let a = CharacterId::new();
        let b = CharacterId::new();
        let mut conv = Conversation::new(vec![a, b], 0);
        conv.add_turn(a, "hello", 0);
        conv.add_turn(a, "still me", 1);
        assert!(conv.has_spoken_last_two_turns(a));
        assert!(!conv.has_spoken_last_two_turns(b));
    }
}
