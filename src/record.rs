use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsify::Tsify;

use crate::session::GameSession;

/// Ruleset tag stored with every finished game.
pub const GAME_MODE: &str = "classic";

/// Written once when a session reaches game over.
#[derive(Clone, Debug, Serialize, Deserialize, Tsify, PartialEq, Eq)]
pub struct FinishedSessionRecord {
    pub player_name: String,
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    pub pieces_placed: u32,
    pub game_duration_seconds: u64,
    pub game_mode: String,
}

impl FinishedSessionRecord {
    /// `None` while the session is still running.
    pub fn from_session(session: &GameSession, player_name: &str, now_ms: u64) -> Option<Self> {
        if session.is_running() {
            return None;
        }
        let stats = session.stats();
        Some(Self {
            player_name: player_name.to_string(),
            score: stats.score,
            level: stats.level,
            lines_cleared: stats.lines_cleared,
            pieces_placed: stats.pieces_placed,
            game_duration_seconds: session.duration_seconds(now_ms),
            game_mode: GAME_MODE.to_string(),
        })
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("store rejected record: {0}")]
    Rejected(String),
}

/// Where finished records go. Failures are logged by the caller and never
/// reach gameplay.
pub trait RecordSink {
    fn submit(&mut self, record: &FinishedSessionRecord) -> Result<(), PersistenceError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn submit(&mut self, _record: &FinishedSessionRecord) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Keeps records in memory; clones share the same list.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<FinishedSessionRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FinishedSessionRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}

impl RecordSink for MemorySink {
    fn submit(&mut self, record: &FinishedSessionRecord) -> Result<(), PersistenceError> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}
