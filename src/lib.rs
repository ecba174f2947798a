pub mod board;
pub mod catalog;
pub mod clearing;
pub mod client;
pub mod clock;
pub mod generator;
pub mod host;
#[cfg(not(target_arch = "wasm32"))]
pub mod leaderboard;
pub mod placement;
pub mod record;
pub mod session;

use wasm_bindgen::prelude::*;

pub use board::{Board, PlacementRejected, HEIGHT, WIDTH};
pub use catalog::{PieceDef, Shape, CATALOG};
pub use clearing::{apply_clears, detect_clears, preview_clear, ClearResult, Region};
pub use client::GameClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use generator::{Cycle, PieceId, PieceInstance, PieceSetGenerator, Randomizer, RandomizerKind, UniformRandom};
pub use host::GameHost;
pub use placement::{can_place, fits_anywhere, is_stuck, placements};
pub use record::{FinishedSessionRecord, MemorySink, NullSink, PersistenceError, RecordSink, GAME_MODE};
pub use session::{GameError, GameSession, GameSettings, Hint, PlacementOutcome, SessionStatus, SessionView};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn log(msg: &str) {
    eprintln!("{}", msg);
}
