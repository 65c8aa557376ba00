//! Autonomous Loop (§4.13): the only scheduler in the engine. Each frame
//! runs Decider → Executor → Game Service tick → broadcast, adapted from the
//! OODA tick shape of the pack's `agent_loop.rs` orchestrator to a
//! `tokio::time::interval`-driven frame rate instead of a bare `fn tick`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use wrldbldr_domain::CharacterId;

use crate::action::Action;
use crate::decider::{DecidedAction, Decider};
use crate::fallback::FallbackLogger;
use crate::service::GameService;

/// Default tick rate (§4.13: "default 2 Hz, range 0.5-60").
pub const DEFAULT_FRAMES_PER_SECOND: f64 = 2.0;
pub const MIN_FRAMES_PER_SECOND: f64 = 0.5;
pub const MAX_FRAMES_PER_SECOND: f64 = 60.0;

/// Minutes the clock advances for a frame whose decision carries no
/// explicit cost of its own (a `Talk` decision starts/continues dialogue
/// rather than an `Action`, so it has no `ActionOutcome::minutes_elapsed`).
const TALK_FRAME_MINUTES: u64 = 5;
const DEFAULT_REST_MINUTES: u64 = 60;

/// How often the loop writes a full checkpoint into the replay log (§4.15:
/// "periodic checkpoint snapshots for faster seek"), on top of the final
/// checkpoint the caller takes once the loop stops.
const CHECKPOINT_INTERVAL_FRAMES: u64 = 50;

pub struct AutonomousLoopConfig {
    pub frames_per_second: f64,
    pub max_frames: Option<u64>,
}

impl Default for AutonomousLoopConfig {
    fn default() -> Self {
        Self {
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            max_frames: None,
        }
    }
}

impl AutonomousLoopConfig {
    pub fn clamped_fps(&self) -> f64 {
        self.frames_per_second.clamp(MIN_FRAMES_PER_SECOND, MAX_FRAMES_PER_SECOND)
    }
}

/// Why the loop stopped, surfaced so callers (CLI, tests) can report a
/// meaningful exit reason instead of just "it stopped".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxFramesReached,
    ProtagonistDied,
    StopRequested,
}

/// Shared flag a caller can set from another task to request a graceful
/// stop at the next frame boundary (§5: "stop() sets a flag observed
/// between frames").
#[derive(Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct AutonomousLoop {
    config: AutonomousLoopConfig,
    decider: Decider,
    stop_handle: StopHandle,
}

impl AutonomousLoop {
    pub fn new(config: AutonomousLoopConfig) -> Self {
        Self {
            config,
            decider: Decider::default(),
            stop_handle: StopHandle::new(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Drives `service` until `maxFrames` is reached, the protagonist dies,
    /// or `stop()` is called. Paused frames still count against `maxFrames`
    /// but do not advance the clock or call the Decider (§4.13: "if paused,
    /// publish nothing and sleep").
    pub async fn run(&mut self, service: &mut GameService, fallback_log: &mut FallbackLogger) -> StopReason {
        let fps = self.config.clamped_fps();
        let frame_duration = Duration::from_secs_f64(1.0 / fps);
        let mut interval = tokio::time::interval(frame_duration);
        let mut frames_run: u64 = 0;

        loop {
            interval.tick().await;

            if self.stop_handle.requested() {
                info!(frames_run, "autonomous loop stopping on stop() request");
                return StopReason::StopRequested;
            }
            if let Some(max) = self.config.max_frames {
                if frames_run >= max {
                    info!(frames_run, "autonomous loop reached max_frames");
                    return StopReason::MaxFramesReached;
                }
            }

            let frame_ms = frame_duration.as_millis() as u64;

            if service.is_paused() {
                service.tick(0, frame_ms);
                frames_run += 1;
                continue;
            }

            let minutes = self.run_frame(service, fallback_log).await;
            service.tick(minutes, frame_ms);
            frames_run += 1;

            if frames_run % CHECKPOINT_INTERVAL_FRAMES == 0 {
                service.checkpoint();
            }

            if service.world().protagonist().is_dead() {
                info!(frames_run, "autonomous loop stopping: protagonist died");
                service.checkpoint();
                return StopReason::ProtagonistDied;
            }
        }
    }

    /// Runs one Decider → Executor cycle and returns how many in-game
    /// minutes it consumed, for the Game Service tick that follows
    /// (§4.13 step 3: "Game Service tick advances the clock by the
    /// action's minute cost").
    async fn run_frame(&mut self, service: &mut GameService, fallback_log: &mut FallbackLogger) -> u64 {
        let frame = service.frame();
        let call_counter = service.next_call_counter();
        let protagonist = service.protagonist_id();

        let decision = self
            .decider
            .decide(
                service.world(),
                service.llm(),
                fallback_log,
                service.rng_mut(),
                frame,
                call_counter,
            )
            .await;

        match decision {
            DecidedAction::Travel { destination } => {
                match service.execute_action(protagonist, Action::Travel { destination }) {
                    Ok(outcome) => outcome.minutes_elapsed,
                    Err(err) => {
                        warn!(%err, "decider proposed an invalid travel action");
                        0
                    }
                }
            }
            DecidedAction::Talk { npc } => {
                run_talk_turn(service, protagonist, npc).await
            }
            DecidedAction::Rest => {
                match service.execute_action(protagonist, Action::Rest { minutes: DEFAULT_REST_MINUTES }) {
                    Ok(outcome) => outcome.minutes_elapsed,
                    Err(err) => {
                        warn!(%err, "rest action failed");
                        0
                    }
                }
            }
        }
    }
}

async fn run_talk_turn(service: &mut GameService, protagonist: CharacterId, npc: CharacterId) -> u64 {
    let existing = service
        .world()
        .active_conversations()
        .find(|c| c.participants.contains(&protagonist) && c.participants.contains(&npc))
        .map(|c| c.id());

    let (conversation_id, minutes_elapsed) = match existing {
        Some(id) => (id, 0),
        // A decided `Talk` opens a new conversation through the Action
        // Executor, not `GameService::start_conversation` directly, so it
        // gets the same validation/time-cost/action-history-log treatment
        // as every other decided action.
        None => match service.execute_action(protagonist, Action::Conversation { participants: vec![protagonist, npc] }) {
            Ok(outcome) => match outcome.conversation_id {
                Some(id) => (id, outcome.minutes_elapsed),
                None => {
                    warn!("conversation action executed but returned no conversation id");
                    return outcome.minutes_elapsed;
                }
            },
            Err(err) => {
                warn!(%err, "could not start conversation with decided npc");
                return 0;
            }
        },
    };

    if let Err(err) = service.add_conversation_turn(conversation_id, protagonist).await {
        warn!(%err, "could not add protagonist's turn to conversation");
        return minutes_elapsed.max(TALK_FRAME_MINUTES);
    }
    if let Err(err) = service.add_conversation_turn(conversation_id, npc).await {
        warn!(%err, "could not add npc's reply to conversation");
    }
    minutes_elapsed.max(TALK_FRAME_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_clamps_to_the_configured_range() {
        let low = AutonomousLoopConfig {
            frames_per_second: 0.01,
            max_frames: None,
        };
        assert_eq!(low.clamped_fps(), MIN_FRAMES_PER_SECOND);

        let high = AutonomousLoopConfig {
            frames_per_second: 1000.0,
            max_frames: None,
        };
        assert_eq!(high.clamped_fps(), MAX_FRAMES_PER_SECOND);
    }

    #[test]
    fn stop_handle_reports_requested_after_stop() {
        let handle = StopHandle::new();
        assert!(!handle.requested());
        handle.stop();
        assert!(handle.requested());
    }
}
