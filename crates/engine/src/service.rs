//! Game Service (§4.12): the single façade the Autonomous Loop (and any
//! future front-end) drives. Owns the world, the event bus, the RNG, the
//! fallback log, the state publisher, and the replay logger, and keeps them
//! all in lockstep — every mutating method updates `world` then drains the
//! bus through the publisher and replay logger before returning.

use std::sync::Arc;

use wrldbldr_domain::{event_kind, CharacterId, ConversationId, DomainEvent, LocationId, SessionId, World};

use crate::action::{self, Action, ActionOutcome};
use crate::clock::Clock;
use crate::combat;
use crate::dialogue::DialogueSubsystem;
use crate::error::{EngineError, UserInputError};
use crate::event_bus::EventBus;
use crate::fallback::FallbackLogger;
use crate::llm::LlmClient;
use crate::publisher::StatePublisher;
use crate::quest_progression::{QuestProgression, QuestProgressionConfig};
use crate::replay::ReplayLogger;
use crate::rng::DeterministicRng;
use crate::state_snapshot::{
    CharactersSummary, DialogueStats, DialogueSummary, LocationSummary, QuestStats, QuestsSummary,
    StateSnapshot, SystemSummary, TimeSummary,
};

pub struct GameService {
    session_id: SessionId,
    world: World,
    bus: EventBus,
    clock: Clock,
    rng: DeterministicRng,
    llm: LlmClient,
    fallback_log: FallbackLogger,
    publisher: StatePublisher,
    replay: ReplayLogger,
    dialogue: DialogueSubsystem,
    quests: QuestProgression,
    frame: u64,
    call_counter: u64,
    paused: bool,
    conversations_started: u64,
    real_time_played_ms: u64,
}

impl GameService {
    pub fn initialize(
        world: World,
        master_seed: u64,
        llm: Arc<dyn crate::llm::LlmPort>,
        model: impl Into<String>,
        config: QuestProgressionConfig,
    ) -> Self {
        let mut replay = ReplayLogger::new(master_seed);
        replay.set_initial_state(world.clone());
        let mut service = Self {
            session_id: SessionId::new(),
            world,
            bus: EventBus::new(),
            clock: Clock::default(),
            rng: DeterministicRng::new(master_seed),
            llm: LlmClient::new(llm, model),
            fallback_log: FallbackLogger::new(),
            publisher: StatePublisher::default(),
            replay,
            dialogue: DialogueSubsystem::default(),
            quests: QuestProgression::new(config),
            frame: 0,
            call_counter: 0,
            paused: false,
            conversations_started: 0,
            real_time_played_ms: 0,
        };
        service.bus.publish(DomainEvent::new(
            0,
            event_kind::GAME_STARTED,
            serde_json::json!({"sessionId": service.session_id}),
            None,
        ));
        service.drain_and_distribute();
        service
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            self.publish_pause_toggled();
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.publish_pause_toggled();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn publish_pause_toggled(&mut self) {
        let frame = self.frame;
        let paused = self.paused;
        self.bus.publish(DomainEvent::new(
            frame,
            event_kind::PAUSE_TOGGLED,
            serde_json::json!({"paused": paused}),
            None,
        ));
        self.drain_and_distribute();
    }

    /// Advances the simulation by one frame. A no-op (besides incrementing
    /// `frame`) while paused — nothing publishes, nothing decides, nothing
    /// advances the clock (§4.13 "pause blocks all progression").
    pub fn tick(&mut self, delta_minutes: u64, frame_duration_ms: u64) {
        self.frame += 1;
        if self.paused {
            return;
        }
        self.real_time_played_ms += frame_duration_ms;
        if let Some(event) = self.clock.advance(delta_minutes, self.frame, &mut self.rng) {
            self.bus.publish(event);
        }
        self.world.clock = *self.clock.get();
        self.bus.publish(DomainEvent::new(
            self.frame,
            event_kind::FRAME_UPDATE,
            serde_json::json!({"frame": self.frame}),
            None,
        ));
        if self.world.protagonist().is_dead() {
            self.bus.publish(DomainEvent::new(
                self.frame,
                event_kind::GAME_ENDED,
                serde_json::json!({"reason": "protagonist_died"}),
                None,
            ));
        }
        self.drain_and_distribute();
    }

    pub fn execute_action(&mut self, actor: CharacterId, requested: Action) -> Result<ActionOutcome, UserInputError> {
        let visited = match &requested {
            Action::Travel { destination } => Some(*destination),
            _ => None,
        };
        let collected = match &requested {
            Action::Trade { item, buying: true, .. } => Some(*item),
            _ => None,
        };

        let outcome = action::execute(&mut self.world, &mut self.bus, &mut self.rng, actor, requested, self.frame)?;

        if let Some(location) = visited {
            self.quests.apply_signal(
                &mut self.world,
                &mut self.bus,
                &crate::quest_progression::ProgressSignal::Visited { location },
                self.frame,
            );
        }
        if let Some(item) = collected {
            self.quests.apply_signal(
                &mut self.world,
                &mut self.bus,
                &crate::quest_progression::ProgressSignal::Collected { item },
                self.frame,
            );
        }
        if outcome.encounter_triggered {
            self.trigger_encounter(actor);
        }
        if outcome.conversation_id.is_some() {
            self.conversations_started += 1;
        }
        self.drain_and_distribute();
        Ok(outcome)
    }

    /// Starts a combat encounter between `actor` and any `Enemy`-role
    /// character sharing its location. A travel roll can flag an encounter
    /// with nothing present to fight (the template world ships no enemies),
    /// in which case nothing is started beyond the roll itself.
    fn trigger_encounter(&mut self, actor: CharacterId) {
        let location = match self.world.character(actor) {
            Some(c) => c.current_location,
            None => return,
        };
        let enemy = self
            .world
            .characters()
            .find(|c| c.current_location == location && c.role == wrldbldr_domain::CharacterRole::Enemy && !c.is_dead())
            .map(|c| c.id());

        if let Some(enemy) = enemy {
            let enemy_kind = self.world.character(enemy).map(|c| c.display_name.clone());
            combat::run_encounter(&mut self.world, &mut self.bus, &[actor, enemy], &mut self.rng, self.frame);
            if let Some(enemy_kind) = enemy_kind {
                if self.world.character(enemy).map(|c| c.is_dead()).unwrap_or(false) {
                    self.quests.apply_signal(
                        &mut self.world,
                        &mut self.bus,
                        &crate::quest_progression::ProgressSignal::Defeated { enemy_kind },
                        self.frame,
                    );
                }
            }
        }
    }

    pub async fn start_conversation(&mut self, participants: Vec<CharacterId>) -> Result<ConversationId, UserInputError> {
        let id = self.dialogue.start(&mut self.world, &mut self.bus, participants, self.frame)?;
        self.conversations_started += 1;
        self.drain_and_distribute();
        Ok(id)
    }

    pub async fn add_conversation_turn(
        &mut self,
        conversation_id: ConversationId,
        speaker: CharacterId,
    ) -> Result<String, UserInputError> {
        self.call_counter += 1;
        let call_counter = self.call_counter;
        let line = self
            .dialogue
            .add_turn(
                &mut self.world,
                &mut self.bus,
                &self.llm,
                &mut self.fallback_log,
                &mut self.rng,
                conversation_id,
                speaker,
                self.frame,
                call_counter,
            )
            .await?;

        let text = line.clone();
        let listener = self
            .world
            .conversation(conversation_id)
            .and_then(|c| c.participants.iter().find(|&&p| p != speaker).copied())
            .unwrap_or(speaker);
        self.quests.apply_signal(
            &mut self.world,
            &mut self.bus,
            &crate::quest_progression::ProgressSignal::Talked {
                speaker,
                listener,
                text: text.clone(),
            },
            self.frame,
        );

        if speaker != self.world.protagonist_id {
            let call_counter = self.next_call_counter();
            self.quests
                .maybe_propose_quest(
                    &mut self.world,
                    &mut self.bus,
                    &self.llm,
                    &mut self.fallback_log,
                    &mut self.rng,
                    &text,
                    speaker,
                    self.frame,
                    call_counter,
                )
                .await;
        }

        self.drain_and_distribute();
        Ok(line)
    }

    pub fn end_conversation(&mut self, conversation_id: ConversationId) {
        self.dialogue.end(&mut self.world, &mut self.bus, conversation_id, self.frame);
        self.drain_and_distribute();
    }

    pub fn discover_location(&mut self, location_id: LocationId) {
        let frame = self.frame;
        if let Some(location) = self.world.location_mut(location_id) {
            if !location.discovered {
                location.mark_discovered();
                self.bus.publish(DomainEvent::new(
                    frame,
                    event_kind::LOCATION_DISCOVERED,
                    serde_json::json!({"locationId": location_id}),
                    None,
                ));
            }
        }
        self.drain_and_distribute();
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn rng_mut(&mut self) -> &mut DeterministicRng {
        &mut self.rng
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    pub fn next_call_counter(&mut self) -> u64 {
        self.call_counter += 1;
        self.call_counter
    }

    pub fn protagonist_id(&self) -> CharacterId {
        self.world.protagonist_id
    }

    /// Writes a full checkpoint of the current world into the replay log.
    pub fn checkpoint(&mut self) {
        self.replay.log_checkpoint(self.frame, self.world.clone());
    }

    pub fn export_state(&self, path: impl AsRef<std::path::Path>) -> Result<(), EngineError> {
        self.replay.write_to_file(path)
    }

    pub fn get_game_state(&self) -> StateSnapshot {
        let protagonist = self.world.protagonist().clone();
        let npcs: Vec<_> = self
            .world
            .characters()
            .filter(|c| c.id() != protagonist.id())
            .cloned()
            .collect();
        let at_location = self
            .world
            .location(protagonist.current_location)
            .map(|l| l.presence().iter().copied().collect())
            .unwrap_or_default();

        let discovered = self.world.locations().filter(|l| l.discovered).map(|l| l.id()).collect();
        let visited = self.world.locations().filter(|l| l.visited).map(|l| l.id()).collect();
        let database = self.world.locations().map(|l| (l.id(), l.clone())).collect();

        let active: Vec<_> = self.world.active_quests().cloned().collect();
        let completed_count = self
            .world
            .quests()
            .filter(|q| q.state == wrldbldr_domain::QuestState::Completed)
            .count();

        let active_conversations: Vec<_> = self.world.active_conversations().cloned().collect();

        StateSnapshot {
            session_id: self.session_id,
            seed: self.rng.master_seed(),
            frame: self.frame,
            time: TimeSummary {
                game_time: self.world.clock.total_minutes(),
                game_time_string: self.world.clock.as_hh_mm(),
                time_of_day: self.world.clock.time_of_day,
                day: self.world.clock.day,
                season: self.world.clock.season,
                year: self.world.clock.year,
                weather: self.world.clock.weather,
            },
            characters: CharactersSummary {
                protagonist,
                npcs,
                at_location,
            },
            location: LocationSummary {
                current: self.world.protagonist().current_location,
                discovered,
                visited,
                database,
            },
            quests: QuestsSummary {
                stats: QuestStats {
                    active_count: active.len(),
                    completed_count,
                },
                active,
            },
            dialogue: DialogueSummary {
                stats: DialogueStats {
                    total_conversations_started: self.conversations_started,
                },
                active_conversations,
            },
            system: SystemSummary {
                paused: self.paused,
                auto_detect_quests: true,
                real_time_played_ms: self.real_time_played_ms,
            },
        }
    }

    /// Drains the event bus once, mirrors every drained event into the
    /// replay log, and broadcasts them to state-publisher subscribers. This
    /// is the one place events leave the bus, so ordering between replay and
    /// live subscribers is always identical.
    fn drain_and_distribute(&mut self) {
        let drained = self.bus.drain();
        for event in &drained {
            if let Err(err) = self.replay.log_event(event.clone()) {
                tracing::error!(%err, "replay log rejected an out-of-order event");
            }
        }
        self.publisher.broadcast(&drained);
    }

    pub fn publisher_mut(&mut self) -> &mut StatePublisher {
        &mut self.publisher
    }

    pub fn start_combat(&mut self, combatants: &[CharacterId]) -> wrldbldr_domain::CombatId {
        let id = combat::run_encounter(&mut self.world, &mut self.bus, combatants, &mut self.rng, self.frame);
        self.drain_and_distribute();
        id
    }
}
