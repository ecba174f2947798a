use crate::clearing::ClearResult;
use crate::clock::Clock;
use crate::generator::PieceId;
use crate::log;
use crate::record::{FinishedSessionRecord, RecordSink};
use crate::session::{GameError, GameSession, GameSettings, Hint, PlacementOutcome, SessionView, SettingsError};

/// Owns the single active session for one player and hands the finished
/// record to the sink exactly once per game.
pub struct GameHost {
    session: GameSession,
    player_name: String,
    clock: Box<dyn Clock>,
    sink: Box<dyn RecordSink>,
    last_record: Option<FinishedSessionRecord>,
}

impl GameHost {
    pub fn new(
        settings: GameSettings,
        player_name: impl Into<String>,
        clock: Box<dyn Clock>,
        sink: Box<dyn RecordSink>,
    ) -> Result<Self, SettingsError> {
        let session = GameSession::new(settings, clock.now_ms())?;
        Ok(Self::with_session(session, player_name, clock, sink))
    }

    pub fn with_session(
        session: GameSession,
        player_name: impl Into<String>,
        clock: Box<dyn Clock>,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        let mut host = Self {
            session,
            player_name: player_name.into(),
            clock,
            sink,
            last_record: None,
        };
        host.finish_if_over();
        host
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player_name = name.into();
    }

    /// The record emitted for the current session, once it has ended.
    pub fn last_record(&self) -> Option<&FinishedSessionRecord> {
        self.last_record.as_ref()
    }

    pub fn attempt_placement(&mut self, id: PieceId, x: i32, y: i32) -> Result<PlacementOutcome, GameError> {
        let outcome = self.session.attempt_placement(id, x, y)?;
        if outcome.game_over {
            self.finish_if_over();
        }
        Ok(outcome)
    }

    pub fn start_new_session(&mut self) {
        self.session.restart(self.clock.now_ms());
        self.last_record = None;
        log(&format!("new session for {}", self.player_name));
        self.finish_if_over();
    }

    pub fn preview_clear(&self, id: PieceId, x: i32, y: i32) -> ClearResult {
        self.session.preview_clear(id, x, y)
    }

    pub fn hint(&self) -> Option<Hint> {
        self.session.hint()
    }

    pub fn snapshot(&self) -> SessionView {
        self.session.snapshot()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        match &self.last_record {
            Some(record) => record.game_duration_seconds,
            None => self.session.duration_seconds(self.clock.now_ms()),
        }
    }

    fn finish_if_over(&mut self) {
        if self.last_record.is_some() {
            return;
        }
        let Some(record) =
            FinishedSessionRecord::from_session(&self.session, &self.player_name, self.clock.now_ms())
        else {
            return;
        };
        log(&format!(
            "game over for {}: score {} level {} lines {}",
            record.player_name, record.score, record.level, record.lines_cleared
        ));
        if let Err(e) = self.sink.submit(&record) {
            log(&format!("failed to store finished game: {e}"));
        }
        self.last_record = Some(record);
    }
}
