use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsify::Tsify;

use crate::board::{Board, BoardView};
use crate::catalog::{PieceDef, ShapeView, CATALOG};
use crate::clearing::{apply_clears, detect_clears, preview_clear, ClearResult};
use crate::generator::{randomizer_from_kind, PieceId, PieceInstance, PieceSetGenerator, RandomizerKind, Randomizer};
use crate::placement::{fits_anywhere, is_stuck, placements};

pub const DEFAULT_SET_SIZE: usize = 3;
pub const DEFAULT_POINTS_PER_LINE: u32 = 10;
pub const DEFAULT_LINES_PER_LEVEL: u32 = 20;

#[derive(Clone, Serialize, Deserialize, Tsify, Debug, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct GameSettings {
    pub set_size: usize,
    pub points_per_line: u32,
    pub lines_per_level: u32,
    pub randomizer: RandomizerKind,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            set_size: DEFAULT_SET_SIZE,
            points_per_line: DEFAULT_POINTS_PER_LINE,
            lines_per_level: DEFAULT_LINES_PER_LEVEL,
            randomizer: RandomizerKind::default(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("set size must be at least 1")]
    EmptySet,
    #[error("lines per level must be at least 1")]
    ZeroLinesPerLevel,
    #[error("piece catalog is empty")]
    EmptyCatalog,
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.set_size == 0 {
            return Err(SettingsError::EmptySet);
        }
        if self.lines_per_level == 0 {
            return Err(SettingsError::ZeroLinesPerLevel);
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GameError {
    #[error("piece {piece} does not fit at ({x}, {y})")]
    InvalidPlacement { piece: PieceId, x: i32, y: i32 },
    #[error("piece {0} is not in the active set")]
    UnknownPiece(PieceId),
    #[error("session is over; start a new one")]
    SessionTerminated,
}

impl GameError {
    /// Both a bad anchor and a stale piece id reject the placement.
    pub fn is_invalid_placement(&self) -> bool {
        matches!(self, GameError::InvalidPlacement { .. } | GameError::UnknownPiece(_))
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    GameOver,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    pub pieces_placed: u32,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            score: 0,
            level: 1,
            lines_cleared: 0,
            pieces_placed: 0,
        }
    }
}

pub fn level_for(total_lines: u32, lines_per_level: u32) -> u32 {
    total_lines / lines_per_level.max(1) + 1
}

pub fn points_for(lines: u32, level: u32, points_per_line: u32) -> u32 {
    lines.saturating_mul(points_per_line).saturating_mul(level)
}

#[derive(Clone, Debug, Serialize, Tsify, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlacementOutcome {
    pub piece: PieceId,
    pub cleared: ClearResult,
    pub lines: u32,
    pub points: u32,
    pub level_up: bool,
    pub refilled: bool,
    pub game_over: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Tsify, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub piece: PieceId,
    pub x: i32,
    pub y: i32,
    pub lines: u32,
}

#[derive(Clone, Debug, Serialize, Tsify, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PieceView {
    pub id: PieceId,
    pub name: String,
    pub color: u8,
    pub shape: ShapeView,
    pub placeable: bool,
}

#[derive(Clone, Debug, Serialize, Tsify, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub board: BoardView,
    pub pieces: Vec<PieceView>,
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    pub pieces_placed: u32,
    pub running: bool,
    pub started_at_ms: u64,
}

/// One game: board, active set, score and the Running/GameOver state.
///
/// Every mutating call either completes fully or returns an error with the
/// session exactly as it was.
pub struct GameSession {
    settings: GameSettings,
    board: Board,
    active: Vec<PieceInstance>,
    stats: SessionStats,
    status: SessionStatus,
    started_at_ms: u64,
    generator: PieceSetGenerator,
}

impl GameSession {
    pub fn new(settings: GameSettings, started_at_ms: u64) -> Result<Self, SettingsError> {
        let randomizer = randomizer_from_kind(&settings.randomizer);
        Self::with_randomizer(settings, CATALOG, randomizer, started_at_ms)
    }

    pub fn with_randomizer(
        settings: GameSettings,
        catalog: &'static [PieceDef],
        randomizer: Box<dyn Randomizer>,
        started_at_ms: u64,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        if catalog.is_empty() {
            return Err(SettingsError::EmptyCatalog);
        }
        let mut session = Self {
            generator: PieceSetGenerator::new(catalog, randomizer),
            settings,
            board: Board::new(),
            active: Vec::new(),
            stats: SessionStats::default(),
            status: SessionStatus::Running,
            started_at_ms,
        };
        session.restart(started_at_ms);
        Ok(session)
    }

    /// Empties the board, zeroes the counters and deals a fresh set.
    pub fn restart(&mut self, started_at_ms: u64) {
        self.board = Board::new();
        self.stats = SessionStats::default();
        self.status = SessionStatus::Running;
        self.started_at_ms = started_at_ms;
        self.active = self.generator.generate_set(self.settings.set_size);
        self.check_game_over();
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn active_set(&self) -> &[PieceInstance] {
        &self.active
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn started_at_ms(&self) -> u64 {
        self.started_at_ms
    }

    /// Whole seconds between session start and `now_ms`.
    pub fn duration_seconds(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms) / 1000
    }

    fn piece(&self, id: PieceId) -> Option<&PieceInstance> {
        self.active.iter().find(|p| p.id == id)
    }

    /// Validate, place, remove from the set, clear, score, refill, then
    /// re-check for game over.
    pub fn attempt_placement(&mut self, id: PieceId, x: i32, y: i32) -> Result<PlacementOutcome, GameError> {
        if !self.is_running() {
            return Err(GameError::SessionTerminated);
        }
        let idx = self
            .active
            .iter()
            .position(|p| p.id == id)
            .ok_or(GameError::UnknownPiece(id))?;
        let def = self.active[idx].def;
        self.board
            .place(&def.shape, def.color, x, y)
            .map_err(|_| GameError::InvalidPlacement { piece: id, x, y })?;
        self.active.remove(idx);
        self.stats.pieces_placed = self.stats.pieces_placed.saturating_add(1);

        let cleared = detect_clears(&self.board);
        apply_clears(&mut self.board, &cleared);
        let lines = cleared.line_count();
        let points = points_for(lines, self.stats.level, self.settings.points_per_line);
        let previous_level = self.stats.level;
        self.stats.score = self.stats.score.saturating_add(points);
        self.stats.lines_cleared = self.stats.lines_cleared.saturating_add(lines);
        self.stats.level = level_for(self.stats.lines_cleared, self.settings.lines_per_level);

        let refilled = self.active.is_empty();
        if refilled {
            self.active = self.generator.generate_set(self.settings.set_size);
        }
        self.check_game_over();

        Ok(PlacementOutcome {
            piece: id,
            cleared,
            lines,
            points,
            level_up: self.stats.level > previous_level,
            refilled,
            game_over: !self.is_running(),
        })
    }

    fn check_game_over(&mut self) {
        if is_stuck(&self.board, self.active.iter().map(|p| &p.def.shape)) {
            self.status = SessionStatus::GameOver;
        }
    }

    /// What committing `id` at the anchor would clear. Unknown ids, bad
    /// anchors and finished sessions all preview as nothing.
    pub fn preview_clear(&self, id: PieceId, x: i32, y: i32) -> ClearResult {
        if !self.is_running() {
            return ClearResult::default();
        }
        match self.piece(id) {
            Some(piece) => preview_clear(&self.board, &piece.def.shape, x, y),
            None => ClearResult::default(),
        }
    }

    pub fn placeable_pieces(&self) -> Vec<(PieceId, bool)> {
        self.active
            .iter()
            .map(|p| (p.id, fits_anywhere(&self.board, &p.def.shape)))
            .collect()
    }

    /// The placement clearing the most lines; earliest piece, then row, then
    /// column wins ties.
    pub fn hint(&self) -> Option<Hint> {
        if !self.is_running() {
            return None;
        }
        let mut best: Option<Hint> = None;
        for piece in &self.active {
            for (x, y) in placements(&self.board, &piece.def.shape) {
                let lines = preview_clear(&self.board, &piece.def.shape, x, y).line_count();
                match &best {
                    Some(current) if lines <= current.lines => {}
                    _ => {
                        best = Some(Hint {
                            piece: piece.id,
                            x,
                            y,
                            lines,
                        });
                    }
                }
            }
        }
        best
    }

    pub fn snapshot(&self) -> SessionView {
        let placeable = self.placeable_pieces();
        SessionView {
            board: self.board.view(),
            pieces: self
                .active
                .iter()
                .zip(placeable)
                .map(|(p, (_, fits))| PieceView {
                    id: p.id,
                    name: p.def.name.to_string(),
                    color: p.def.color,
                    shape: ShapeView::from(&p.def.shape),
                    placeable: fits,
                })
                .collect(),
            score: self.stats.score,
            level: self.stats.level,
            lines_cleared: self.stats.lines_cleared,
            pieces_placed: self.stats.pieces_placed,
            running: self.is_running(),
            started_at_ms: self.started_at_ms,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_board(&mut self, board: Board) {
        self.board = board;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Shape;
    use crate::generator::Cycle;

    const ROW_CATALOG: &[PieceDef] = &[PieceDef {
        name: "row",
        shape: Shape::new(&[&[1, 1, 1, 1, 1, 1, 1, 1, 1]]),
        color: 3,
    }];

    const DOT_AND_BIG: &[PieceDef] = &[
        PieceDef {
            name: "dot",
            shape: Shape::new(&[&[1]]),
            color: 1,
        },
        PieceDef {
            name: "big",
            shape: Shape::new(&[&[1, 1, 1], &[1, 1, 1], &[1, 1, 1]]),
            color: 9,
        },
    ];

    fn session(catalog: &'static [PieceDef], order: Vec<usize>) -> GameSession {
        GameSession::with_randomizer(GameSettings::default(), catalog, Box::new(Cycle::new(order)), 0).unwrap()
    }

    /// Dots at the centre of every region, except optionally one.
    fn region_centres(skip: Option<(usize, usize)>) -> Board {
        let mut board = Board::new();
        let dot = Shape::new(&[&[1]]);
        for y in [1, 4, 7] {
            for x in [1, 4, 7] {
                if Some((x, y)) != skip {
                    board.place(&dot, 1, x as i32, y as i32).unwrap();
                }
            }
        }
        board
    }

    #[test]
    fn full_row_piece_clears_itself() {
        let mut game = session(ROW_CATALOG, vec![0]);
        let id = game.active_set()[0].id;
        let outcome = game.attempt_placement(id, 0, 0).unwrap();
        assert_eq!(outcome.cleared.rows, vec![0]);
        assert!(outcome.cleared.columns.is_empty());
        assert!(outcome.cleared.regions.is_empty());
        assert!(game.board().is_clear());
        assert_eq!(game.stats().lines_cleared, 1);
        assert_eq!(game.stats().score, 10);
        assert_eq!(outcome.points, 10);
        assert_eq!(game.stats().pieces_placed, 1);
    }

    #[test]
    fn set_refills_only_after_last_piece() {
        let mut game = session(CATALOG, vec![0]);
        let ids: Vec<_> = game.active_set().iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), 3);

        let first = game.attempt_placement(ids[0], 0, 0).unwrap();
        assert!(!first.refilled);
        assert_eq!(game.active_set().len(), 2);
        let second = game.attempt_placement(ids[1], 2, 0).unwrap();
        assert!(!second.refilled);
        assert_eq!(game.active_set().len(), 1);
        let third = game.attempt_placement(ids[2], 4, 0).unwrap();
        assert!(third.refilled);

        let fresh: Vec<_> = game.active_set().iter().map(|p| p.id).collect();
        assert_eq!(fresh.len(), 3);
        assert!(fresh.iter().all(|id| !ids.contains(id)));
        assert_eq!(game.stats().pieces_placed, 3);
    }

    #[test]
    fn rejected_placement_changes_nothing() {
        let mut game = session(CATALOG, vec![11, 0, 0]);
        let big = game.active_set()[0].id;
        let before = game.snapshot();

        assert_eq!(
            game.attempt_placement(big, 7, 7),
            Err(GameError::InvalidPlacement { piece: big, x: 7, y: 7 })
        );
        assert_eq!(game.attempt_placement(PieceId(999), 0, 0), Err(GameError::UnknownPiece(PieceId(999))));
        assert_eq!(game.snapshot(), before);

        game.attempt_placement(big, 0, 0).unwrap();
        let err = game.attempt_placement(big, 3, 3).unwrap_err();
        assert!(err.is_invalid_placement());
    }

    #[test]
    fn session_ends_when_nothing_fits_and_then_refuses_moves() {
        // dot, big, big: the dot takes the only 3x3 hole left.
        let mut game = session(DOT_AND_BIG, vec![0, 1, 1]);
        game.set_board(region_centres(Some((4, 4))));
        let dot = game.active_set()[0].id;
        let big = game.active_set()[1].id;
        assert_eq!(game.placeable_pieces()[1], (big, true));

        let outcome = game.attempt_placement(dot, 4, 4).unwrap();
        assert!(outcome.game_over);
        assert!(outcome.cleared.is_empty());
        assert_eq!(game.status(), SessionStatus::GameOver);
        assert!(!game.snapshot().running);

        let stats = game.stats();
        assert_eq!(game.attempt_placement(big, 0, 0), Err(GameError::SessionTerminated));
        assert_eq!(game.stats(), stats);
        assert!(game.hint().is_none());
        assert!(game.preview_clear(big, 0, 0).is_empty());
    }

    #[test]
    fn game_over_iff_no_piece_fits_anywhere() {
        let mut game = session(DOT_AND_BIG, vec![1, 1, 0]);
        game.set_board(region_centres(None));
        let ids: Vec<_> = game.active_set().iter().map(|p| p.id).collect();
        // The remaining dot still fits, so placing one big square is refused
        // but the game keeps running.
        assert!(game.attempt_placement(ids[0], 0, 0).is_err());
        let outcome = game.attempt_placement(ids[2], 0, 0).unwrap();
        assert!(outcome.game_over);
    }

    #[test]
    fn restart_resets_board_counters_and_set() {
        let mut game = session(ROW_CATALOG, vec![0]);
        let id = game.active_set()[0].id;
        game.attempt_placement(id, 0, 3).unwrap();
        game.restart(5_000);
        assert!(game.board().is_clear());
        assert_eq!(game.stats(), SessionStats::default());
        assert_eq!(game.active_set().len(), 3);
        assert!(game.active_set().iter().all(|p| p.id != id));
        assert_eq!(game.started_at_ms(), 5_000);
        assert_eq!(game.duration_seconds(17_999), 12);
    }

    #[test]
    fn level_rises_once_per_twenty_lines() {
        let mut game = session(ROW_CATALOG, vec![0]);
        let mut last_level = 1;
        for n in 1..=45u32 {
            let id = game.active_set()[0].id;
            let level_before = game.stats().level;
            let outcome = game.attempt_placement(id, 0, (n % 9) as i32).unwrap();
            assert_eq!(outcome.points, 10 * level_before);
            let level = game.stats().level;
            assert!(level >= last_level);
            assert_eq!(level, n / 20 + 1);
            assert_eq!(outcome.level_up, level > last_level);
            last_level = level;
        }
        assert_eq!(game.stats().score, 20 * 10 + 20 * 20 + 5 * 30);
    }

    #[test]
    fn scoring_helpers() {
        assert_eq!(level_for(0, 20), 1);
        assert_eq!(level_for(19, 20), 1);
        assert_eq!(level_for(20, 20), 2);
        assert_eq!(level_for(59, 20), 3);
        assert_eq!(points_for(3, 2, 10), 60);
    }

    #[test]
    fn preview_matches_commit() {
        let mut game = session(DOT_AND_BIG, vec![0]);
        game.set_board(Board::from_rows([
            "11111111.",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
        ]));
        let dot = game.active_set()[0].id;
        let before = game.snapshot();
        let preview = game.preview_clear(dot, 8, 0);
        assert_eq!(game.snapshot(), before);
        assert_eq!(preview.rows, vec![0]);
        assert!(game.preview_clear(dot, 0, 0).is_empty());
        assert!(game.preview_clear(PieceId(404), 8, 0).is_empty());

        let outcome = game.attempt_placement(dot, 8, 0).unwrap();
        assert_eq!(outcome.cleared, preview);
    }

    #[test]
    fn hint_prefers_the_clearing_move() {
        let mut game = session(DOT_AND_BIG, vec![0]);
        game.set_board(Board::from_rows([
            ".........",
            ".........",
            "1111.1111",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
            ".........",
        ]));
        let hint = game.hint().unwrap();
        assert_eq!((hint.x, hint.y, hint.lines), (4, 2, 1));
        assert_eq!(hint.piece, game.active_set()[0].id);
    }

    #[test]
    fn settings_validation() {
        assert_eq!(GameSettings::default().validate(), Ok(()));
        let bad = GameSettings {
            set_size: 0,
            ..GameSettings::default()
        };
        assert_eq!(bad.validate(), Err(SettingsError::EmptySet));
        assert!(GameSession::new(bad, 0).is_err());
        let bad = GameSettings {
            lines_per_level: 0,
            ..GameSettings::default()
        };
        assert_eq!(bad.validate(), Err(SettingsError::ZeroLinesPerLevel));
    }

    #[test]
    fn empty_catalog_is_rejected() {
        const NO_PIECES: &[PieceDef] = &[];
        let result = GameSession::with_randomizer(GameSettings::default(), NO_PIECES, Box::new(Cycle::new(vec![0])), 0);
        assert_eq!(result.err(), Some(SettingsError::EmptyCatalog));
    }

    #[test]
    fn settings_fill_missing_fields_from_defaults() {
        let settings: GameSettings = serde_json::from_str(r#"{"setSize":2}"#).unwrap();
        assert_eq!(settings.set_size, 2);
        assert_eq!(settings.points_per_line, DEFAULT_POINTS_PER_LINE);
        assert_eq!(settings.randomizer, RandomizerKind::default());
    }
}
