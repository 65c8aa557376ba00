//! Character aggregate (§3 Data Model — Character).
//!
//! # Invariants
//!
//! - `hp`, `stamina`, `magic`, `gold` are always within `[0, max]`.
//! - `inventory` weight never exceeds `capacity`.
//! - `dead` becomes `true` exactly when `hp` reaches zero; the record is never
//!   removed afterwards (§3: "the record persists for replay").
//! - `relationships` values are always clamped to `[-100, 100]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{AbilityId, CharacterId, ItemId, LocationId};

/// A character's narrative function in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterRole {
    Protagonist,
    Npc,
    Enemy,
}

/// Six integer personality traits, each clamped to `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    pub bravery: u8,
    pub curiosity: u8,
    pub loyalty: u8,
    pub greed: u8,
    pub empathy: u8,
    pub temper: u8,
}

impl Default for Personality {
    fn default() -> Self {
        Self {
            bravery: 50,
            curiosity: 50,
            loyalty: 50,
            greed: 50,
            empathy: 50,
            temper: 50,
        }
    }
}

/// Six core attributes used for derived rolls (combat hit/dodge, skill checks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

/// A bounded resource with a current and max value; mutation clamps to `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    current: u32,
    max: u32,
}

impl Resource {
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Subtract `amount`, clamped at zero. Returns the amount actually removed.
    pub fn drain(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.current);
        self.current -= removed;
        removed
    }

    /// Add `amount`, clamped at `max`. Returns the amount actually restored.
    pub fn restore(&mut self, amount: u32) -> u32 {
        let room = self.max - self.current;
        let added = amount.min(room);
        self.current += added;
        added
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }
}

/// Stat block: level, the three bounded resources, attack/defense, six
/// attributes, and experience.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Stats {
    pub level: u32,
    pub hp: Resource,
    pub stamina: Resource,
    pub magic: Resource,
    pub attack: u32,
    pub defense: u32,
    pub attributes: Attributes,
    pub experience: u32,
}

impl Stats {
    pub fn new_level_one() -> Self {
        Self {
            level: 1,
            hp: Resource::full(100),
            stamina: Resource::full(50),
            magic: Resource::full(20),
            attack: 10,
            defense: 5,
            attributes: Attributes::default(),
            experience: 0,
        }
    }
}

/// Experience required to reach `level + 1`, a simple triangular curve.
pub fn experience_to_next_level(level: u32) -> u32 {
    level * 100
}

/// A single slot in a character's ordered inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventorySlot {
    pub item_id: ItemId,
    pub quantity: u32,
    pub weight_each: u32,
}

/// Ordered inventory with a gold purse and a weight cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<InventorySlot>,
    capacity: u32,
    gold: u32,
}

impl Inventory {
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
            gold: 0,
        }
    }

    pub fn slots(&self) -> &[InventorySlot] {
        &self.slots
    }

    pub fn gold(&self) -> u32 {
        self.gold
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn total_weight(&self) -> u32 {
        self.slots.iter().map(|s| s.weight_each * s.quantity).sum()
    }

    /// Adds `quantity` of `item_id` (stacking onto an existing slot if present).
    /// Rejects the add if it would push total weight past capacity.
    pub fn add_item(
        &mut self,
        item_id: ItemId,
        quantity: u32,
        weight_each: u32,
    ) -> Result<(), crate::error::DomainError> {
        let added_weight = weight_each * quantity;
        if self.total_weight() + added_weight > self.capacity {
            return Err(crate::error::DomainError::ContainerFull {
                current: self.total_weight(),
                max: self.capacity,
            });
        }
        if let Some(slot) = self.slots.iter_mut().find(|s| s.item_id == item_id) {
            slot.quantity += quantity;
        } else {
            self.slots.push(InventorySlot {
                item_id,
                quantity,
                weight_each,
            });
        }
        Ok(())
    }

    /// Removes up to `quantity` of `item_id`. Returns the amount actually removed.
    pub fn remove_item(&mut self, item_id: ItemId, quantity: u32) -> u32 {
        let Some(idx) = self.slots.iter().position(|s| s.item_id == item_id) else {
            return 0;
        };
        let slot = &mut self.slots[idx];
        let removed = quantity.min(slot.quantity);
        slot.quantity -= removed;
        if slot.quantity == 0 {
            self.slots.remove(idx);
        }
        removed
    }

    pub fn has_item(&self, item_id: ItemId) -> bool {
        self.slots.iter().any(|s| s.item_id == item_id && s.quantity > 0)
    }

    pub fn add_gold(&mut self, amount: u32) {
        self.gold += amount;
    }

    /// Spends gold if affordable; returns `false` (no mutation) otherwise.
    pub fn spend_gold(&mut self, amount: u32) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }
}

/// Fixed equipment slots. `None` means the slot is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Equipment {
    pub weapon: Option<ItemId>,
    pub offhand: Option<ItemId>,
    pub head: Option<ItemId>,
    pub chest: Option<ItemId>,
    pub legs: Option<ItemId>,
    pub hands: Option<ItemId>,
    pub feet: Option<ItemId>,
    pub accessory_1: Option<ItemId>,
    pub accessory_2: Option<ItemId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentSlot {
    Weapon,
    Offhand,
    Head,
    Chest,
    Legs,
    Hands,
    Feet,
    Accessory1,
    Accessory2,
}

impl Equipment {
    pub fn slot_mut(&mut self, slot: EquipmentSlot) -> &mut Option<ItemId> {
        match slot {
            EquipmentSlot::Weapon => &mut self.weapon,
            EquipmentSlot::Offhand => &mut self.offhand,
            EquipmentSlot::Head => &mut self.head,
            EquipmentSlot::Chest => &mut self.chest,
            EquipmentSlot::Legs => &mut self.legs,
            EquipmentSlot::Hands => &mut self.hands,
            EquipmentSlot::Feet => &mut self.feet,
            EquipmentSlot::Accessory1 => &mut self.accessory_1,
            EquipmentSlot::Accessory2 => &mut self.accessory_2,
        }
    }
}

/// An ability a character can use, with its cost and cooldown state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,
    pub name: String,
    pub stamina_cost: u32,
    pub magic_cost: u32,
    pub cooldown_max: u32,
    pub cooldown_remaining: u32,
    pub effect: String,
    pub requires_melee: bool,
}

impl Ability {
    pub fn is_ready(&self) -> bool {
        self.cooldown_remaining == 0
    }

    pub fn trigger_cooldown(&mut self) {
        self.cooldown_remaining = self.cooldown_max;
    }

    pub fn tick_cooldown(&mut self) {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(1);
    }
}

/// What an NPC knows: things it will freely share, things it's heard, and
/// things it will only reveal under the right conditions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Knowledge {
    pub specialties: Vec<String>,
    pub rumors: Vec<String>,
    pub secrets: Vec<String>,
}

impl Knowledge {
    /// Whether this character counts as a specialist for `topic` (§7 Dialogue
    /// context assembly: "knowledge filtered by whether the NPC is a specialist").
    pub fn is_specialist_for(&self, topic: &str) -> bool {
        let topic = topic.to_ascii_lowercase();
        self.specialties
            .iter()
            .any(|s| s.to_ascii_lowercase().contains(&topic))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Conversation,
    Combat,
    Discovery,
    QuestEvent,
}

/// A single remembered event, bounded in number per character (oldest low-
/// importance memories are pruned first once the cap is hit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub kind: MemoryKind,
    pub text: String,
    pub importance: u8,
    pub frame: u64,
}

const MAX_MEMORIES: usize = 64;

/// The protagonist/NPC/enemy record itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    id: CharacterId,
    pub display_name: String,
    pub role: CharacterRole,
    pub personality: Personality,
    pub stats: Stats,
    pub inventory: Inventory,
    pub equipment: Equipment,
    pub abilities: Vec<Ability>,
    pub knowledge: Knowledge,
    memories: Vec<MemoryRecord>,
    relationships: HashMap<CharacterId, i32>,
    pub current_location: LocationId,
    pub grid_x: i32,
    pub grid_y: i32,
    pub mood: String,
    pub concern: Option<String>,
    pub backstory: String,
    dead: bool,
}

impl Character {
    pub fn new(
        display_name: impl Into<String>,
        role: CharacterRole,
        current_location: LocationId,
    ) -> Self {
        Self {
            id: CharacterId::new(),
            display_name: display_name.into(),
            role,
            personality: Personality::default(),
            stats: Stats::new_level_one(),
            inventory: Inventory::new(100),
            equipment: Equipment::default(),
            abilities: Vec::new(),
            knowledge: Knowledge::default(),
            memories: Vec::new(),
            relationships: HashMap::new(),
            current_location,
            grid_x: 0,
            grid_y: 0,
            mood: "neutral".to_string(),
            concern: None,
            backstory: String::new(),
            dead: false,
        }
    }

    pub fn id(&self) -> CharacterId {
        self.id
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Applies damage, clamping HP at zero and flagging death. Returns the HP
    /// actually removed.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let removed = self.stats.hp.drain(amount);
        if self.stats.hp.is_empty() {
            self.dead = true;
        }
        removed
    }

    /// Heals HP; has no effect once dead (§3: HP reaching zero is terminal for
    /// the run, the record is not revivable mid-session).
    pub fn heal(&mut self, amount: u32) -> u32 {
        if self.dead {
            return 0;
        }
        self.stats.hp.restore(amount)
    }

    /// Grants experience and applies every level-up the new total crosses.
    /// Returns the number of levels gained (0 if none).
    pub fn gain_experience(&mut self, amount: u32) -> u32 {
        self.stats.experience += amount;
        let mut levels_gained = 0;
        while self.stats.experience >= experience_to_next_level(self.stats.level) {
            self.stats.experience -= experience_to_next_level(self.stats.level);
            self.stats.level += 1;
            self.stats.hp = Resource::full(self.stats.hp.max() + 10);
            self.stats.stamina = Resource::full(self.stats.stamina.max() + 5);
            self.stats.attack += 2;
            self.stats.defense += 1;
            levels_gained += 1;
        }
        levels_gained
    }

    /// Current relationship value toward `other`, defaulting to neutral (0).
    pub fn relationship_with(&self, other: CharacterId) -> i32 {
        *self.relationships.get(&other).unwrap_or(&0)
    }

    /// Adjusts the relationship toward `other` by `delta`, clamped to
    /// `[-100, 100]`.
    pub fn adjust_relationship(&mut self, other: CharacterId, delta: f32) {
        let current = self.relationship_with(other) as f32;
        let updated = (current + delta).clamp(-100.0, 100.0).round() as i32;
        self.relationships.insert(other, updated);
    }

    pub fn relationships(&self) -> &HashMap<CharacterId, i32> {
        &self.relationships
    }

    /// Records a memory, pruning the least important old entry once the
    /// bounded list is full.
    pub fn remember(&mut self, record: MemoryRecord) {
        if self.memories.len() >= MAX_MEMORIES {
            if let Some((idx, _)) = self
                .memories
                .iter()
                .enumerate()
                .min_by_key(|(_, m)| m.importance)
            {
                self.memories.remove(idx);
            }
        }
        self.memories.push(record);
    }

    pub fn memories(&self) -> &[MemoryRecord] {
        &self.memories
    }
}
