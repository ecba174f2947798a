use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

use crate::catalog::palette;
use crate::clock::SystemClock;
use crate::generator::PieceId;
use crate::host::GameHost;
use crate::log;
use crate::record::{FinishedSessionRecord, PersistenceError, RecordSink};
use crate::session::{GameError, GameSettings};

/// Hands finished records to a JS callback. Whatever the callback returns,
/// including a promise, is dropped without waiting.
struct JsCallbackSink {
    callback: Rc<RefCell<Option<js_sys::Function>>>,
}

impl RecordSink for JsCallbackSink {
    fn submit(&mut self, record: &FinishedSessionRecord) -> Result<(), PersistenceError> {
        let Some(callback) = self.callback.borrow().clone() else {
            return Ok(());
        };
        let value = to_value(record).map_err(|e| PersistenceError::Rejected(e.to_string()))?;
        callback
            .call1(&JsValue::NULL, &value)
            .map(|_| ())
            .map_err(|e| PersistenceError::Rejected(format!("{:?}", e)))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientError {
    kind: &'static str,
    message: String,
}

fn game_error(e: GameError) -> JsValue {
    let kind = match e {
        GameError::InvalidPlacement { .. } | GameError::UnknownPiece(_) => "invalidPlacement",
        GameError::SessionTerminated => "sessionTerminated",
    };
    let err = ClientError {
        kind,
        message: e.to_string(),
    };
    to_value(&err).unwrap_or_else(|_| JsValue::from_str(&err.message))
}

#[wasm_bindgen]
pub struct GameClient {
    host: GameHost,
    on_game_over: Rc<RefCell<Option<js_sys::Function>>>,
}

#[wasm_bindgen]
impl GameClient {
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue, player_name: String) -> Result<GameClient, JsValue> {
        let settings: GameSettings = from_value(settings).unwrap_or_default();
        let on_game_over = Rc::new(RefCell::new(None));
        let sink = JsCallbackSink {
            callback: on_game_over.clone(),
        };
        let host = GameHost::new(settings, player_name, Box::new(SystemClock), Box::new(sink))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        log("[cat-tetris] session started");
        Ok(Self { host, on_game_over })
    }

    #[wasm_bindgen(js_name = attemptPlacement)]
    pub fn attempt_placement(&mut self, piece_id: u32, x: i32, y: i32) -> Result<JsValue, JsValue> {
        let outcome = self
            .host
            .attempt_placement(PieceId(piece_id), x, y)
            .map_err(game_error)?;
        to_value(&outcome).map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = previewClear)]
    pub fn preview_clear(&self, piece_id: u32, x: i32, y: i32) -> Result<JsValue, JsValue> {
        to_value(&self.host.preview_clear(PieceId(piece_id), x, y)).map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = startNewSession)]
    pub fn start_new_session(&mut self) {
        self.host.start_new_session();
    }

    #[wasm_bindgen(js_name = snapshot)]
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_value(&self.host.snapshot()).map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.host.snapshot()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = hint)]
    pub fn hint(&self) -> Result<JsValue, JsValue> {
        to_value(&self.host.hint()).map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = elapsedSeconds)]
    pub fn elapsed_seconds(&self) -> f64 {
        self.host.elapsed_seconds() as f64
    }

    #[wasm_bindgen(js_name = lastRecord)]
    pub fn last_record(&self) -> Result<JsValue, JsValue> {
        to_value(&self.host.last_record()).map_err(|e| e.into())
    }

    /// Registers the callback that receives each finished-game record.
    #[wasm_bindgen(js_name = onGameOver)]
    pub fn on_game_over(&mut self, callback: js_sys::Function) {
        *self.on_game_over.borrow_mut() = Some(callback);
    }

    #[wasm_bindgen(js_name = setPlayerName)]
    pub fn set_player_name(&mut self, name: String) {
        self.host.set_player_name(name);
    }

    #[wasm_bindgen(js_name = palette)]
    pub fn palette(&self) -> Result<JsValue, JsValue> {
        to_value(&palette()).map_err(|e| e.into())
    }
}
