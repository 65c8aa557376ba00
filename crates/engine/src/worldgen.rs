//! World generation seam (§6): the content-collaborator service that
//! authors locations, NPCs, and the opening quest is an external system out
//! of this crate's scope. `WorldGeneratorPort` is the boundary; in the
//! absence of that collaborator, `TemplateWorldGenerator` bootstraps a
//! small fixed starting world so the engine can run standalone.

use wrldbldr_domain::{
    Character, CharacterRole, Coordinates, Location, LocationScale, Objective, ObjectiveTarget,
    ObjectiveType, Quest, Terrain, World,
};

pub trait WorldGeneratorPort: Send + Sync {
    /// Produces a bootstrapped world for a new session, themed by `theme`
    /// and seeded by `seed` for any generation-time randomness.
    fn generate(&self, theme: &str, seed: u64) -> World;
}

/// Builds a small fixed town/forest starting area with one NPC and one
/// fetch quest, regardless of `theme` — a stand-in for the real
/// content-collaborator, not a content-authoring system in its own right.
pub struct TemplateWorldGenerator;

impl WorldGeneratorPort for TemplateWorldGenerator {
    fn generate(&self, theme: &str, _seed: u64) -> World {
        let mut town = Location::new("Town Square", LocationScale::Town, Terrain::Flat);
        town.description_sparse = format!("A quiet square at the heart of a {theme} town.");
        town.mark_discovered();
        town.mark_visited();

        let mut forest = Location::new("Dark Forest", LocationScale::Area, Terrain::Forest);
        forest.coordinates = Coordinates { x: 12, y: 4, z: 0 };
        forest.description_sparse = "A forest path vanishing into shadow.".to_string();

        let (town_id, forest_id) = (town.id(), forest.id());

        let mut protagonist = Character::new("Wanderer", CharacterRole::Protagonist, town_id);
        protagonist.backstory = format!("A traveler newly arrived in a {theme} land.");

        let mut gareth = Character::new("Gareth", CharacterRole::Npc, town_id);
        gareth.knowledge.specialties.push("the missing grain shipment".to_string());
        gareth.mood = "worried".to_string();
        gareth.concern = Some("The grain cellar has gone quiet".to_string());

        let protagonist_id = protagonist.id();
        let gareth_id = gareth.id();

        let quest = Quest::new(
            "The Missing Grain",
            "Gareth's cellar has gone quiet and he fears the worst.",
            gareth_id,
            "fetch",
            vec![
                Objective::new(
                    "Talk to Gareth about the missing grain",
                    ObjectiveType::Talk,
                    ObjectiveTarget::Character(gareth_id),
                ),
                Objective::new(
                    "Visit the Dark Forest",
                    ObjectiveType::Visit,
                    ObjectiveTarget::Location(forest_id),
                ),
            ],
        );

        let mut world = World::new(protagonist_id);
        world.insert_location(town);
        world.insert_location(forest);
        world.link_parent_child(town_id, forest_id);
        world.insert_character(protagonist);
        world.insert_character(gareth);
        world.insert_quest(quest);
        world
    }
}
