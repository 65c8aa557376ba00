//! Item definitions (§3 Character.inventory / §4.10 Action Executor trade).

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Price multiplier used by the trade action (§4.10).
    pub fn price_multiplier(self) -> f64 {
        match self {
            Rarity::Common => 1.0,
            Rarity::Uncommon => 1.5,
            Rarity::Rare => 2.5,
            Rarity::Epic => 5.0,
            Rarity::Legendary => 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    pub name: String,
    pub description: String,
    pub base_value: u32,
    pub weight: u32,
    pub rarity: Rarity,
}

impl Item {
    pub fn new(name: impl Into<String>, base_value: u32, weight: u32, rarity: Rarity) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            description: String::new(),
            base_value,
            weight,
            rarity,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }
}
