//! Action Executor (§4.10): validates and applies the protagonist's and
//! NPCs' discrete actions. Every action either fully applies or fully fails
//! (§4.10 atomicity) — validation happens before any mutation.

use wrldbldr_domain::{
    event_kind, CharacterId, ConversationId, DomainEvent, EquipmentSlot, ItemId, LocationId, World,
};

use crate::error::UserInputError;
use crate::rng::{DeterministicRng, RngStream};

/// Minutes per unit of coarse Euclidean distance at the base movement speed
/// over flat terrain (§4.10 travel-cost formula).
const MINUTES_PER_DISTANCE_UNIT: f64 = 5.0;
const BASE_MOVEMENT_SPEED: f64 = 1.0;

/// Chance a combat encounter is rolled after completing a travel action.
pub const ENCOUNTER_CHANCE: f64 = 0.15;

/// Minutes a conversation's opening exchange costs, matching the autonomous
/// loop's own per-turn talk cost (§4.13's `Talk` decision).
const CONVERSATION_INIT_MINUTES: u64 = 5;

#[derive(Debug, Clone)]
pub enum Action {
    Travel { destination: LocationId },
    Investigate,
    Rest { minutes: u64 },
    Search,
    Trade { merchant: CharacterId, item: ItemId, quantity: u32, buying: bool },
    UseItem { item: ItemId },
    Equip { item: ItemId, slot: EquipmentSlot },
    Unequip { slot: EquipmentSlot },
    Conversation { participants: Vec<CharacterId> },
    GroupConversation { participants: Vec<CharacterId> },
}

impl Action {
    fn tag(&self) -> &'static str {
        match self {
            Action::Travel { .. } => "travel",
            Action::Investigate => "investigate",
            Action::Rest { .. } => "rest",
            Action::Search => "search",
            Action::Trade { .. } => "trade",
            Action::UseItem { .. } => "use_item",
            Action::Equip { .. } => "equip",
            Action::Unequip { .. } => "unequip",
            Action::Conversation { .. } => "conversation",
            Action::GroupConversation { .. } => "group_conversation",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub description: String,
    pub minutes_elapsed: u64,
    pub encounter_triggered: bool,
    /// Set only by `conversation`/`group_conversation`, the id of the
    /// conversation the Dialogue Subsystem just started.
    pub conversation_id: Option<ConversationId>,
}

/// Executes `action` on behalf of `actor`. On success, publishes
/// `action_executed{success:true}` and returns the outcome; on failure,
/// publishes `action_executed{success:false}` with the reason and returns
/// the same error to the caller. No partial state changes occur either way.
pub fn execute(
    world: &mut World,
    bus: &mut crate::event_bus::EventBus,
    rng: &mut DeterministicRng,
    actor: CharacterId,
    action: Action,
    frame: u64,
) -> Result<ActionOutcome, UserInputError> {
    let result = execute_inner(world, bus, rng, actor, &action, frame);

    match &result {
        Ok(outcome) => bus.publish(DomainEvent::new(
            frame,
            event_kind::ACTION_EXECUTED,
            serde_json::json!({
                "actor": actor,
                "action": action.tag(),
                "success": true,
                "description": outcome.description,
            }),
            Some(actor),
        )),
        Err(err) => bus.publish(DomainEvent::new(
            frame,
            event_kind::ACTION_EXECUTED,
            serde_json::json!({
                "actor": actor,
                "action": action.tag(),
                "success": false,
                "reason": err.to_string(),
            }),
            Some(actor),
        )),
    }

    result
}

fn execute_inner(
    world: &mut World,
    bus: &mut crate::event_bus::EventBus,
    rng: &mut DeterministicRng,
    actor: CharacterId,
    action: &Action,
    frame: u64,
) -> Result<ActionOutcome, UserInputError> {
    match action {
        Action::Travel { destination } => travel(world, bus, rng, actor, *destination, frame),
        Action::Investigate => investigate(world, actor),
        Action::Rest { minutes } => rest(world, actor, *minutes),
        Action::Search => search(world, rng, actor),
        Action::Trade { merchant, item, quantity, buying } => {
            trade(world, bus, actor, *merchant, *item, *quantity, *buying, frame)
        }
        Action::UseItem { item } => use_item(world, actor, *item),
        Action::Equip { item, slot } => equip(world, actor, *item, *slot),
        Action::Unequip { slot } => unequip(world, actor, *slot),
        Action::Conversation { participants } => {
            initiate_conversation(world, bus, actor, participants.clone(), false, frame)
        }
        Action::GroupConversation { participants } => {
            initiate_conversation(world, bus, actor, participants.clone(), true, frame)
        }
    }
}

fn travel(
    world: &mut World,
    bus: &mut crate::event_bus::EventBus,
    rng: &mut DeterministicRng,
    actor: CharacterId,
    destination: LocationId,
    frame: u64,
) -> Result<ActionOutcome, UserInputError> {
    let character = world
        .character(actor)
        .ok_or_else(|| UserInputError::TargetNotFound(actor.to_string()))?;
    let origin_id = character.current_location;
    if origin_id == destination {
        return Err(UserInputError::AlreadyAtDestination);
    }
    let dest_location = world
        .location(destination)
        .ok_or_else(|| UserInputError::TargetNotFound(destination.to_string()))?;
    if !dest_location.discovered {
        return Err(UserInputError::LocationNotDiscovered(destination.to_string()));
    }
    let origin = world
        .location(origin_id)
        .ok_or_else(|| UserInputError::TargetNotFound(origin_id.to_string()))?;

    let dx = (dest_location.coordinates.x - origin.coordinates.x) as f64;
    let dy = (dest_location.coordinates.y - origin.coordinates.y) as f64;
    let dz = (dest_location.coordinates.z - origin.coordinates.z).unsigned_abs() as f64;
    let distance = (dx * dx + dy * dy).sqrt();
    let minutes = (distance
        * MINUTES_PER_DISTANCE_UNIT
        * origin.terrain.movement_multiplier()
        * (1.0 + 0.5 * dz)
        / BASE_MOVEMENT_SPEED)
        .round()
        .max(1.0) as u64;

    world
        .move_character(actor, destination)
        .map_err(|e| UserInputError::NotAllowed(e.to_string()))?;

    let location = world
        .location_mut(destination)
        .expect("destination was confirmed to exist above");
    location.mark_visited();
    location.mark_discovered();
    location.expand_detail(next_detail_level(location.detail_level()));
    let destination_name = location.name.clone();

    bus.publish(DomainEvent::new(
        frame,
        event_kind::LOCATION_CHANGED,
        serde_json::json!({"actor": actor, "from": origin_id, "to": destination}),
        Some(actor),
    ));

    let roll = rng.gen_f64(RngStream::Encounter);
    let encounter_triggered = roll < ENCOUNTER_CHANCE;

    Ok(ActionOutcome {
        description: format!("Traveled to {destination_name}"),
        minutes_elapsed: minutes,
        encounter_triggered,
        conversation_id: None,
    })
}

/// Routes `conversation`/`group_conversation` through the Dialogue
/// Subsystem so initiation gets the same validation/time-cost/history-log
/// treatment as every other action kind, instead of bypassing the executor
/// entirely (as direct `GameService::start_conversation` calls still do for
/// ongoing turns — only the opening of a conversation is an action).
fn initiate_conversation(
    world: &mut World,
    bus: &mut crate::event_bus::EventBus,
    actor: CharacterId,
    participants: Vec<CharacterId>,
    group: bool,
    frame: u64,
) -> Result<ActionOutcome, UserInputError> {
    if !participants.contains(&actor) {
        return Err(UserInputError::NotAllowed("actor must be a participant".into()));
    }
    if group && participants.len() < 3 {
        return Err(UserInputError::NotEnoughParticipants);
    }
    if !group && participants.len() != 2 {
        return Err(UserInputError::NotAllowed(
            "a one-on-one conversation takes exactly two participants".into(),
        ));
    }

    let count = participants.len();
    let conversation_id = crate::dialogue::DialogueSubsystem::default().start(world, bus, participants, frame)?;

    Ok(ActionOutcome {
        description: format!("Started a conversation among {count} participants"),
        minutes_elapsed: CONVERSATION_INIT_MINUTES,
        encounter_triggered: false,
        conversation_id: Some(conversation_id),
    })
}

fn investigate(world: &mut World, actor: CharacterId) -> Result<ActionOutcome, UserInputError> {
    let location_id = world
        .character(actor)
        .ok_or_else(|| UserInputError::TargetNotFound(actor.to_string()))?
        .current_location;
    let location = world
        .location_mut(location_id)
        .ok_or_else(|| UserInputError::TargetNotFound(location_id.to_string()))?;
    location.expand_detail(next_detail_level(location.detail_level()));
    Ok(ActionOutcome {
        description: format!("Investigated {}", location.name),
        minutes_elapsed: 10,
        encounter_triggered: false,
        conversation_id: None,
    })
}

fn next_detail_level(current: wrldbldr_domain::DetailLevel) -> wrldbldr_domain::DetailLevel {
    use wrldbldr_domain::DetailLevel::*;
    match current {
        Sparse => Partial,
        Partial | Full => Full,
    }
}

fn rest(world: &mut World, actor: CharacterId, minutes: u64) -> Result<ActionOutcome, UserInputError> {
    let character = world
        .character_mut(actor)
        .ok_or_else(|| UserInputError::TargetNotFound(actor.to_string()))?;
    let restored_stamina = character.stats.stamina.restore((minutes / 2) as u32);
    let restored_magic = character.stats.magic.restore((minutes / 4) as u32);
    Ok(ActionOutcome {
        description: format!("Rested, recovering {restored_stamina} stamina and {restored_magic} magic"),
        minutes_elapsed: minutes,
        encounter_triggered: false,
        conversation_id: None,
    })
}

fn search(world: &mut World, rng: &mut DeterministicRng, actor: CharacterId) -> Result<ActionOutcome, UserInputError> {
    let location_id = world
        .character(actor)
        .ok_or_else(|| UserInputError::TargetNotFound(actor.to_string()))?
        .current_location;
    let location = world
        .location(location_id)
        .ok_or_else(|| UserInputError::TargetNotFound(location_id.to_string()))?;
    let found_rumor = if !location.narrative_fuel.rumors.is_empty() {
        let idx = rng.gen_range(RngStream::Encounter, 0, location.narrative_fuel.rumors.len() as i32) as usize;
        Some(location.narrative_fuel.rumors[idx].text.clone())
    } else {
        None
    };
    if let Some(rumor) = &found_rumor {
        world.rumor_log.push(rumor.clone());
    }
    Ok(ActionOutcome {
        description: found_rumor.unwrap_or_else(|| "Found nothing of note".to_string()),
        minutes_elapsed: 15,
        encounter_triggered: false,
        conversation_id: None,
    })
}

#[allow(clippy::too_many_arguments)]
fn trade(
    world: &mut World,
    bus: &mut crate::event_bus::EventBus,
    actor: CharacterId,
    merchant: CharacterId,
    item: ItemId,
    quantity: u32,
    buying: bool,
    frame: u64,
) -> Result<ActionOutcome, UserInputError> {
    let relationship = world
        .character(actor)
        .map(|c| c.relationship_with(merchant))
        .unwrap_or(0);
    // Relationship discount up to 50% at maximum (+100) relationship.
    let discount = (relationship.max(0) as f64 / 100.0) * 0.5;
    const MERCHANT_GREED: f64 = 1.2;

    let (base_value, weight) = {
        let merchant_char = world
            .character(merchant)
            .ok_or_else(|| UserInputError::TargetNotFound(merchant.to_string()))?;
        let slot = merchant_char
            .inventory
            .slots()
            .iter()
            .find(|s| s.item_id == item)
            .ok_or_else(|| UserInputError::TargetNotFound(item.to_string()))?;
        (slot.weight_each, slot.weight_each)
    };
    let _ = base_value;

    // Item value itself isn't carried on InventorySlot; trade uses a flat
    // per-unit price derived from weight as a stand-in for a catalog lookup
    // the world-generation layer would normally supply.
    let unit_price = (weight as f64 * 2.0 * MERCHANT_GREED * (1.0 - discount)).round().max(1.0) as u32;
    let total = unit_price * quantity;

    if buying {
        let buyer = world
            .character_mut(actor)
            .ok_or_else(|| UserInputError::TargetNotFound(actor.to_string()))?;
        if buyer.inventory.gold() < total {
            return Err(UserInputError::InsufficientGold {
                needed: total,
                have: buyer.inventory.gold(),
            });
        }
        buyer.inventory.spend_gold(total);
        buyer
            .inventory
            .add_item(item, quantity, weight)
            .map_err(|_| UserInputError::InventoryFull)?;
        let new_total = buyer.inventory.gold();
        bus.publish(DomainEvent::new(
            frame,
            event_kind::GOLD_CHANGED,
            serde_json::json!({"actor": actor, "amount": -(total as i64), "newTotal": new_total}),
            Some(actor),
        ));
        bus.publish(DomainEvent::new(
            frame,
            event_kind::LOOT_OBTAINED,
            serde_json::json!({"actor": actor, "item": item, "quantity": quantity}),
            Some(actor),
        ));
        if let Some(merchant_char) = world.character_mut(merchant) {
            merchant_char.inventory.remove_item(item, quantity);
            merchant_char.inventory.add_gold(total);
        }
    } else {
        let seller = world
            .character_mut(actor)
            .ok_or_else(|| UserInputError::TargetNotFound(actor.to_string()))?;
        let removed = seller.inventory.remove_item(item, quantity);
        if removed == 0 {
            return Err(UserInputError::TargetNotFound(item.to_string()));
        }
        seller.inventory.add_gold(total);
        let new_total = seller.inventory.gold();
        bus.publish(DomainEvent::new(
            frame,
            event_kind::GOLD_CHANGED,
            serde_json::json!({"actor": actor, "amount": total, "newTotal": new_total}),
            Some(actor),
        ));
        if let Some(merchant_char) = world.character_mut(merchant) {
            let _ = merchant_char.inventory.add_item(item, quantity, weight);
            merchant_char.inventory.spend_gold(total.min(merchant_char.inventory.gold()));
        }
    }

    Ok(ActionOutcome {
        description: format!("Traded {quantity} for {total} gold"),
        minutes_elapsed: 5,
        encounter_triggered: false,
        conversation_id: None,
    })
}

fn use_item(world: &mut World, actor: CharacterId, item: ItemId) -> Result<ActionOutcome, UserInputError> {
    let character = world
        .character_mut(actor)
        .ok_or_else(|| UserInputError::TargetNotFound(actor.to_string()))?;
    if !character.inventory.has_item(item) {
        return Err(UserInputError::TargetNotFound(item.to_string()));
    }
    character.inventory.remove_item(item, 1);
    let restored = character.heal(25);
    Ok(ActionOutcome {
        description: format!("Used an item, restoring {restored} HP"),
        minutes_elapsed: 1,
        encounter_triggered: false,
        conversation_id: None,
    })
}

fn equip(
    world: &mut World,
    actor: CharacterId,
    item: ItemId,
    slot: EquipmentSlot,
) -> Result<ActionOutcome, UserInputError> {
    let character = world
        .character_mut(actor)
        .ok_or_else(|| UserInputError::TargetNotFound(actor.to_string()))?;
    if !character.inventory.has_item(item) {
        return Err(UserInputError::TargetNotFound(item.to_string()));
    }
    *character.equipment.slot_mut(slot) = Some(item);
    Ok(ActionOutcome {
        description: "Equipped item".to_string(),
        minutes_elapsed: 1,
        encounter_triggered: false,
        conversation_id: None,
    })
}

fn unequip(world: &mut World, actor: CharacterId, slot: EquipmentSlot) -> Result<ActionOutcome, UserInputError> {
    let character = world
        .character_mut(actor)
        .ok_or_else(|| UserInputError::TargetNotFound(actor.to_string()))?;
    *character.equipment.slot_mut(slot) = None;
    Ok(ActionOutcome {
        description: "Unequipped item".to_string(),
        minutes_elapsed: 1,
        encounter_triggered: false,
        conversation_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrldbldr_domain::{Character, CharacterRole, Coordinates, Location, LocationScale, Terrain};

    fn two_locations() -> (World, CharacterId, LocationId, LocationId) {
        let mut origin = Location::new("Town", LocationScale::Town, Terrain::Flat);
        origin.mark_discovered();
        let mut dest = Location::new("Forest", LocationScale::Area, Terrain::Forest);
        dest.coordinates = Coordinates { x: 10, y: 0, z: 0 };
        dest.mark_discovered();
        let (origin_id, dest_id) = (origin.id(), dest.id());
        let protagonist = Character::new("Aldric", CharacterRole::Protagonist, origin_id);
        let pid = protagonist.id();
        let mut world = World::new(pid);
        world.insert_location(origin);
        world.insert_location(dest);
        world.insert_character(protagonist);
        (world, pid, origin_id, dest_id)
    }

    #[test]
    fn traveling_to_the_same_location_is_rejected() {
        let (mut world, pid, origin_id, _dest_id) = two_locations();
        let mut bus = crate::event_bus::EventBus::new();
        let mut rng = DeterministicRng::new(1);
        let result = execute(
            &mut world,
            &mut bus,
            &mut rng,
            pid,
            Action::Travel { destination: origin_id },
            0,
        );
        assert!(matches!(result, Err(UserInputError::AlreadyAtDestination)));
    }

    #[test]
    fn traveling_moves_the_character_and_costs_time_proportional_to_distance() {
        let (mut world, pid, _origin_id, dest_id) = two_locations();
        let mut bus = crate::event_bus::EventBus::new();
        let mut rng = DeterministicRng::new(1);
        let outcome = execute(
            &mut world,
            &mut bus,
            &mut rng,
            pid,
            Action::Travel { destination: dest_id },
            0,
        )
        .unwrap();
        assert_eq!(world.character(pid).unwrap().current_location, dest_id);
        // distance 10 * 5 min/unit * flat terrain 1.0 = 50 minutes
        assert_eq!(outcome.minutes_elapsed, 50);
    }

    #[test]
    fn resting_restores_stamina_proportional_to_minutes() {
        let (mut world, pid, _o, _d) = two_locations();
        world.character_mut(pid).unwrap().stats.stamina.drain(40);
        let mut bus = crate::event_bus::EventBus::new();
        let mut rng = DeterministicRng::new(1);
        execute(&mut world, &mut bus, &mut rng, pid, Action::Rest { minutes: 60 }, 0).unwrap();
        assert_eq!(world.character(pid).unwrap().stats.stamina.current(), 40);
    }

    #[test]
    fn traveling_expands_the_destination_detail_level() {
        let (mut world, pid, _origin_id, dest_id) = two_locations();
        assert_eq!(
            world.location(dest_id).unwrap().detail_level(),
            wrldbldr_domain::DetailLevel::Sparse
        );
        let mut bus = crate::event_bus::EventBus::new();
        let mut rng = DeterministicRng::new(1);
        execute(&mut world, &mut bus, &mut rng, pid, Action::Travel { destination: dest_id }, 0).unwrap();
        assert_eq!(
            world.location(dest_id).unwrap().detail_level(),
            wrldbldr_domain::DetailLevel::Partial
        );
    }

    #[test]
    fn starting_a_conversation_through_the_executor_returns_its_id() {
        let (mut world, pid, origin_id, _dest_id) = two_locations();
        let npc = Character::new("Mira", CharacterRole::Npc, origin_id);
        let nid = npc.id();
        world.insert_character(npc);
        let mut bus = crate::event_bus::EventBus::new();
        let mut rng = DeterministicRng::new(1);
        let outcome = execute(
            &mut world,
            &mut bus,
            &mut rng,
            pid,
            Action::Conversation { participants: vec![pid, nid] },
            0,
        )
        .unwrap();
        assert!(outcome.conversation_id.is_some());
        assert_eq!(outcome.minutes_elapsed, CONVERSATION_INIT_MINUTES);
    }

    #[test]
    fn a_one_on_one_conversation_rejects_a_third_participant() {
        let (mut world, pid, origin_id, _dest_id) = two_locations();
        let nid1 = Character::new("Mira", CharacterRole::Npc, origin_id).id();
        let nid2 = Character::new("Corin", CharacterRole::Npc, origin_id).id();
        let mut bus = crate::event_bus::EventBus::new();
        let mut rng = DeterministicRng::new(1);
        let result = execute(
            &mut world,
            &mut bus,
            &mut rng,
            pid,
            Action::Conversation { participants: vec![pid, nid1, nid2] },
            0,
        );
        assert!(matches!(result, Err(UserInputError::NotAllowed(_))));
    }

    #[test]
    fn a_group_conversation_needs_at_least_three_participants() {
        let (mut world, pid, origin_id, _dest_id) = two_locations();
        let nid = Character::new("Mira", CharacterRole::Npc, origin_id).id();
        let mut bus = crate::event_bus::EventBus::new();
        let mut rng = DeterministicRng::new(1);
        let result = execute(
            &mut world,
            &mut bus,
            &mut rng,
            pid,
            Action::GroupConversation { participants: vec![pid, nid] },
            0,
        );
        assert!(matches!(result, Err(UserInputError::NotEnoughParticipants)));
    }

    #[test]
    fn a_conversation_without_the_actor_as_participant_is_rejected() {
        let (mut world, pid, origin_id, _dest_id) = two_locations();
        let nid1 = Character::new("Mira", CharacterRole::Npc, origin_id).id();
        let nid2 = Character::new("Corin", CharacterRole::Npc, origin_id).id();
        let mut bus = crate::event_bus::EventBus::new();
        let mut rng = DeterministicRng::new(1);
        let result = execute(
            &mut world,
            &mut bus,
            &mut rng,
            pid,
            Action::Conversation { participants: vec![nid1, nid2] },
            0,
        );
        assert!(matches!(result, Err(UserInputError::NotAllowed(_))));
    }
}
