//! Headless, deterministic, LLM-driven autonomous role-playing simulation
//! kernel (§1 Overview). See `SPEC_FULL.md` at the workspace root for the
//! full module map; each submodule here corresponds to one numbered
//! component of that map.

pub mod action;
pub mod autonomous_loop;
pub mod clock;
pub mod combat;
pub mod config;
pub mod continuation;
pub mod decider;
pub mod dialogue;
pub mod error;
pub mod event_bus;
pub mod fallback;
pub mod llm;
pub mod publisher;
pub mod quest_progression;
pub mod replay;
pub mod rng;
pub mod service;
pub mod state_snapshot;
pub mod worldgen;

pub use error::{EngineError, FallbackReason, UserInputError};
pub use rng::{DeterministicRng, RngStream};
pub use service::GameService;
pub use state_snapshot::StateSnapshot;
