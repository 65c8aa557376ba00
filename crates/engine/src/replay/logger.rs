//! Replay Logger (§4.15): the in-memory event/LLM-call/checkpoint sequences
//! that eventually get written out as a [`ReplayFile`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use wrldbldr_domain::{DomainEvent, LlmCallRecord, World};

use super::format::{Checkpoint, ReplayFile};
use crate::error::EngineError;

pub struct ReplayLogger {
    master_seed: u64,
    initial_state: Option<World>,
    events: Vec<DomainEvent>,
    llm_calls: Vec<LlmCallRecord>,
    checkpoints: Vec<Checkpoint>,
    last_logged_frame: u64,
}

impl ReplayLogger {
    pub fn new(master_seed: u64) -> Self {
        Self {
            master_seed,
            initial_state: None,
            events: Vec::new(),
            llm_calls: Vec::new(),
            checkpoints: Vec::new(),
            last_logged_frame: 0,
        }
    }

    pub fn set_initial_state(&mut self, world: World) {
        self.initial_state = Some(world);
    }

    /// Appends `event` to the log. Frames must never go backwards (§4.15
    /// frame-monotonicity invariant) — violating callers get an error
    /// instead of a silently corrupted log.
    pub fn log_event(&mut self, event: DomainEvent) -> Result<(), EngineError> {
        if event.frame < self.last_logged_frame {
            return Err(EngineError::Replay(format!(
                "event frame {} is behind the last logged frame {}",
                event.frame, self.last_logged_frame
            )));
        }
        self.last_logged_frame = event.frame;
        self.events.push(event);
        Ok(())
    }

    pub fn log_llm_call(&mut self, record: LlmCallRecord) {
        self.llm_calls.push(record);
    }

    pub fn log_checkpoint(&mut self, frame: u64, world: World) {
        self.checkpoints.push(Checkpoint { frame, world });
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Serializes the log to a gzip-compressed JSON file at `path`.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let initial_state = self
            .initial_state
            .clone()
            .ok_or_else(|| EngineError::Replay("no initial state recorded".into()))?;
        let mut file = ReplayFile::new(self.master_seed, initial_state);
        file.events = self.events.clone();
        file.llm_calls = self.llm_calls.clone();
        file.checkpoints = self.checkpoints.clone();

        let json = serde_json::to_vec(&file)
            .map_err(|e| EngineError::Replay(format!("serialization failed: {e}")))?;
        let out = File::create(path).map_err(|e| EngineError::Replay(e.to_string()))?;
        let mut encoder = GzEncoder::new(BufWriter::new(out), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|e| EngineError::Replay(e.to_string()))?;
        encoder.finish().map_err(|e| EngineError::Replay(e.to_string()))?;
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<ReplayFile, EngineError> {
        let file = File::open(path).map_err(|e| EngineError::Replay(e.to_string()))?;
        let mut decoder = GzDecoder::new(BufReader::new(file));
        let mut json = String::new();
        decoder
            .read_to_string(&mut json)
            .map_err(|e| EngineError::Replay(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| EngineError::Replay(format!("corrupt replay file: {e}")))
    }
}
