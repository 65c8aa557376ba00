//! End-to-end scenario tests (§4.18/§8): each function below is one of the
//! concrete S1-S6 scenarios, driven entirely through `GameService` the way a
//! front-end would, with a canned `LlmPort` double standing in for a live
//! endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use wrldbldr_domain::{
    event_kind, Character, CharacterRole, DomainEvent, Location, LocationScale, Objective,
    ObjectiveTarget, ObjectiveType, Quest, Terrain, World,
};
use wrldbldr_engine::action::Action;
use wrldbldr_engine::error::FallbackReason;
use wrldbldr_engine::llm::{LlmClient, LlmError, LlmPort, LlmRequest, LlmResponse};
use wrldbldr_engine::quest_progression::QuestProgressionConfig;
use wrldbldr_engine::rng::DeterministicRng;
use wrldbldr_engine::service::GameService;
use wrldbldr_engine::worldgen::{TemplateWorldGenerator, WorldGeneratorPort};

/// Always answers with a fixed line of dialogue, never errors. Stands in for
/// the LLM endpoint in every scenario that doesn't specifically exercise the
/// fallback path.
struct DeterministicLlmClient {
    line: String,
}

impl DeterministicLlmClient {
    fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }
}

#[async_trait]
impl LlmPort for DeterministicLlmClient {
    async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            text: self.line.clone(),
            token_count: self.line.split_whitespace().count() as u32,
        })
    }
}

/// Never succeeds; used for S3's LLM-unavailable scenario.
struct UnavailableLlmClient;

#[async_trait]
impl LlmPort for UnavailableLlmClient {
    async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::RequestFailed("connection refused".into()))
    }
}

/// S1. Quest objective auto-completion: talking to the quest giver completes
/// the "talk" objective and the conversation flows through to `dialogue_ended`.
#[tokio::test]
async fn s1_talking_to_the_quest_giver_completes_the_first_objective() {
    let generator = TemplateWorldGenerator;
    let mut world = generator.generate("fantasy", 12345);
    world.protagonist_mut().display_name = "Aldric".to_string();
    let protagonist_id = world.protagonist_id;
    let gareth_id = world
        .characters()
        .find(|c| c.display_name == "Gareth")
        .map(|c| c.id())
        .expect("template world ships Gareth");
    let quest_id = world.active_quests().next().map(|q| q.id()).expect("template world ships a quest");

    let llm: Arc<dyn LlmPort> = Arc::new(DeterministicLlmClient::new("The grain's gone missing, I fear the worst."));
    let mut service = GameService::initialize(world, 12345, llm, "test-model", QuestProgressionConfig::default());

    let conv_id = service.start_conversation(vec![protagonist_id, gareth_id]).await.unwrap();
    service.add_conversation_turn(conv_id, protagonist_id).await.unwrap();
    service.add_conversation_turn(conv_id, gareth_id).await.unwrap();
    service.end_conversation(conv_id);

    assert!(service.world().quest(quest_id).unwrap().objectives[0].completed);

    let history: Vec<&str> = service.publisher_mut().history().map(|e| e.kind.as_str()).collect();
    let started = history.iter().position(|&k| k == event_kind::DIALOGUE_STARTED).unwrap();
    let objective_done = history.iter().position(|&k| k == event_kind::QUEST_OBJECTIVE_COMPLETED).unwrap();
    let ended = history.iter().position(|&k| k == event_kind::DIALOGUE_ENDED).unwrap();
    assert!(started < objective_done);
    assert!(objective_done < ended);
    assert!(history.iter().filter(|&&k| k == event_kind::DIALOGUE_TURN).count() >= 1);
}

/// S2. Travel + encounter timeout: a travel action advances the clock,
/// changes location, and either rolls no encounter or runs a full combat to
/// a timeout (20 rounds, zero reward) against an enemy sharing the
/// destination.
#[tokio::test]
async fn s2_travel_relocates_the_protagonist_and_may_trigger_combat() {
    let generator = TemplateWorldGenerator;
    let mut world = generator.generate("fantasy", 99999);
    let protagonist_id = world.protagonist_id;
    let forest_id = world
        .locations()
        .find(|l| l.name == "Dark Forest")
        .map(|l| l.id())
        .expect("template world ships Dark Forest");
    // The template world ships no enemies and travel isn't allowed to an
    // undiscovered destination; discover it up front the way a prior
    // `investigate`/exploration step would have.
    world.location_mut(forest_id).unwrap().mark_discovered();
    let enemy = Character::new("Bandit", CharacterRole::Enemy, forest_id);
    let enemy_id = enemy.id();
    world.insert_character(enemy);

    let llm: Arc<dyn LlmPort> = Arc::new(DeterministicLlmClient::new("..."));
    let mut service = GameService::initialize(world, 99999, llm, "test-model", QuestProgressionConfig::default());

    let outcome = service.execute_action(protagonist_id, Action::Travel { destination: forest_id }).unwrap();
    assert!(outcome.minutes_elapsed > 0);
    assert_eq!(service.world().character(protagonist_id).unwrap().current_location, forest_id);

    let kinds: Vec<&str> = service.publisher_mut().history().map(|e| e.kind.as_str()).collect();
    assert!(kinds.contains(&event_kind::ACTION_EXECUTED));
    assert!(kinds.contains(&event_kind::LOCATION_CHANGED));

    if kinds.contains(&event_kind::COMBAT_STARTED) {
        let turns = kinds.iter().filter(|&&k| k == event_kind::COMBAT_TURN).count();
        assert!(turns > 0);
        assert!(kinds.contains(&event_kind::COMBAT_ENDED));
        // The bandit alone against an unarmed protagonist at default stats
        // either dies, kills the protagonist, or the round cap is hit; any
        // of those is a valid resolution as long as it terminates.
        let _ = enemy_id;
    }
}

/// S3. LLM unavailable: a dialogue turn never hard-fails; it falls back to a
/// canned line and logs `fallback:used` with the `LLM_UNAVAILABLE` reason.
#[tokio::test]
async fn s3_llm_unavailable_falls_back_without_an_error_event() {
    let town = Location::new("Town Square", LocationScale::Town, Terrain::Flat);
    let town_id = town.id();
    let protagonist = Character::new("Aldric", CharacterRole::Protagonist, town_id);
    let npc = Character::new("Gareth", CharacterRole::Npc, town_id);
    let (pid, nid) = (protagonist.id(), npc.id());
    let mut world = World::new(pid);
    world.insert_location(town);
    world.insert_character(protagonist);
    world.insert_character(npc);

    let llm: Arc<dyn LlmPort> = Arc::new(UnavailableLlmClient);
    let mut service = GameService::initialize(world, 1, llm, "test-model", QuestProgressionConfig::default());

    let conv_id = service.start_conversation(vec![pid, nid]).await.unwrap();
    let line = service.add_conversation_turn(conv_id, nid).await.unwrap();
    assert!(!line.trim().is_empty());

    let history: Vec<&DomainEvent> = service.publisher_mut().history().collect();
    assert!(history.iter().any(|e| e.kind == event_kind::DIALOGUE_STARTED));
    assert!(history.iter().any(|e| e.kind == event_kind::DIALOGUE_TURN));
    let fallback = history
        .iter()
        .find(|e| e.kind == event_kind::FALLBACK_USED)
        .expect("a fallback:used event was published");
    assert_eq!(fallback.payload["reason"], FallbackReason::LlmUnavailable.as_str());
    assert!(!history.iter().any(|e| e.kind == event_kind::ERROR));
}

/// S4. Replay determinism: two sessions built from the same seed and the
/// same deterministic LLM responses produce byte-identical event sequences,
/// hashed over (kind, canonical payload) the way a replay comparison would.
#[tokio::test]
async fn s4_identical_seed_and_llm_responses_produce_an_identical_event_hash() {
    async fn run_session(seed: u64) -> Vec<DomainEvent> {
        let generator = TemplateWorldGenerator;
        let world = generator.generate("fantasy", seed);
        let protagonist_id = world.protagonist_id;
        let gareth_id = world.characters().find(|c| c.display_name == "Gareth").unwrap().id();
        let llm: Arc<dyn LlmPort> = Arc::new(DeterministicLlmClient::new("A fixed line, always the same."));
        let mut service = GameService::initialize(world, seed, llm, "test-model", QuestProgressionConfig::default());

        let conv_id = service.start_conversation(vec![protagonist_id, gareth_id]).await.unwrap();
        service.add_conversation_turn(conv_id, protagonist_id).await.unwrap();
        service.add_conversation_turn(conv_id, gareth_id).await.unwrap();
        service.end_conversation(conv_id);
        service.tick(10, 500);

        service.publisher_mut().history().cloned().collect()
    }

    fn event_hash(events: &[DomainEvent]) -> String {
        let mut hasher = Sha256::new();
        for event in events {
            hasher.update(event.kind.as_bytes());
            hasher.update(event.payload.to_string().as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    let seed = 42;
    let first = run_session(seed).await;
    let second = run_session(seed).await;

    assert_eq!(first.len(), second.len());
    assert_eq!(event_hash(&first), event_hash(&second));
}

/// S5. Quest reward grant: completing a quest's final objective grants gold
/// and experience, publishing `quest_completed`, `gold_changed`, and
/// `level_up` iff a level threshold was crossed.
#[tokio::test]
async fn s5_completing_a_quest_grants_rewards_and_crosses_a_level() {
    let town = Location::new("Town", LocationScale::Town, Terrain::Flat);
    let town_id = town.id();
    let protagonist = Character::new("Aldric", CharacterRole::Protagonist, town_id);
    let giver = Character::new("Gareth", CharacterRole::Npc, town_id);
    let (pid, gid) = (protagonist.id(), giver.id());
    let mut world = World::new(pid);
    world.insert_location(town);
    world.insert_character(protagonist);
    world.insert_character(giver);

    let mut quest = Quest::new(
        "Final favor",
        "One last thing",
        gid,
        "fetch",
        vec![Objective::new("Talk to Gareth", ObjectiveType::Talk, ObjectiveTarget::Character(gid))],
    );
    quest.rewards.gold = 100;
    quest.rewards.experience = 200;
    world.insert_quest(quest);

    let llm: Arc<dyn LlmPort> = Arc::new(DeterministicLlmClient::new("At last, it's done."));
    let mut service = GameService::initialize(world, 7, llm, "test-model", QuestProgressionConfig::default());

    let gold_before = service.world().protagonist().inventory.gold();
    let conv_id = service.start_conversation(vec![pid, gid]).await.unwrap();
    service.add_conversation_turn(conv_id, gid).await.unwrap();

    let protagonist_after = service.world().protagonist();
    assert_eq!(protagonist_after.inventory.gold(), gold_before + 100);
    assert_eq!(protagonist_after.stats.level, 2);

    let history: Vec<&DomainEvent> = service.publisher_mut().history().collect();
    let completed = history.iter().position(|e| e.kind == event_kind::QUEST_COMPLETED).unwrap();
    let gold_changed = history.iter().position(|e| e.kind == event_kind::GOLD_CHANGED).unwrap();
    let level_up = history.iter().position(|e| e.kind == event_kind::LEVEL_UP).unwrap();
    assert!(completed < gold_changed);
    assert!(gold_changed < level_up);
}

/// S6. Pause blocks progression: while paused, `tick` still advances the
/// frame counter (so the loop can notice it's paused) but nothing else
/// moves; `pause_toggled` fires exactly once per transition.
#[test]
fn s6_pause_blocks_clock_and_frame_events_until_resumed() {
    let town = Location::new("Town", LocationScale::Town, Terrain::Flat);
    let town_id = town.id();
    let protagonist = Character::new("Aldric", CharacterRole::Protagonist, town_id);
    let pid = protagonist.id();
    let mut world = World::new(pid);
    world.insert_location(town);
    world.insert_character(protagonist);

    let llm: Arc<dyn LlmPort> = Arc::new(DeterministicLlmClient::new("n/a"));
    let mut service = GameService::initialize(world, 3, llm, "test-model", QuestProgressionConfig::default());

    service.pause();
    assert!(service.is_paused());
    let frame_before = service.frame();
    let minutes_before = service.world().clock.total_minutes();
    service.tick(30, 500);
    service.tick(30, 500);
    assert_eq!(service.frame(), frame_before + 2);
    assert_eq!(service.world().clock.total_minutes(), minutes_before);

    let pause_toggles = service
        .publisher_mut()
        .history()
        .filter(|e| e.kind == event_kind::PAUSE_TOGGLED)
        .count();
    assert_eq!(pause_toggles, 1);

    service.resume();
    let resumed_frame = service.frame();
    service.tick(15, 500);
    assert_eq!(service.frame(), resumed_frame + 1);
    assert!(service.world().clock.total_minutes() > minutes_before);

    let pause_toggles_after_resume = service
        .publisher_mut()
        .history()
        .filter(|e| e.kind == event_kind::PAUSE_TOGGLED)
        .count();
    assert_eq!(pause_toggles_after_resume, 2);
}

/// Sanity check that the `DeterministicRng` seam itself is what S4 relies
/// on: same seed, same master seed readout, independent of any LLM call.
#[test]
fn deterministic_rng_reports_its_master_seed() {
    let rng = DeterministicRng::new(123);
    assert_eq!(rng.master_seed(), 123);
}

/// `LlmClient::model` is threaded through to every subsystem's requests
/// rather than hardcoded, so an operator's `--model` override actually
/// reaches the endpoint.
#[tokio::test]
async fn llm_client_exposes_the_configured_model_name() {
    let llm = LlmClient::new(Arc::new(DeterministicLlmClient::new("hi")), "custom-model");
    assert_eq!(llm.model(), "custom-model");
}
