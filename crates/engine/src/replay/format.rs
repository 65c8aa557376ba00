//! On-disk replay file schema (§6): a gzip-compressed JSON document with a
//! version header, the bootstrap world state, and three parallel logs.

use serde::{Deserialize, Serialize};
use wrldbldr_domain::{DomainEvent, LlmCallRecord, World};

pub const REPLAY_FORMAT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub frame: u64,
    pub world: World,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayFile {
    pub version: String,
    pub master_seed: u64,
    pub initial_state: World,
    pub events: Vec<DomainEvent>,
    pub llm_calls: Vec<LlmCallRecord>,
    pub checkpoints: Vec<Checkpoint>,
}

impl ReplayFile {
    pub fn new(master_seed: u64, initial_state: World) -> Self {
        Self {
            version: REPLAY_FORMAT_VERSION.to_string(),
            master_seed,
            initial_state,
            events: Vec::new(),
            llm_calls: Vec::new(),
            checkpoints: Vec::new(),
        }
    }
}
