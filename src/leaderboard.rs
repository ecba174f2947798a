//! JSON-lines leaderboard file: one finished game per line, tagged with the
//! family it belongs to.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::log;
use crate::record::{FinishedSessionRecord, PersistenceError, RecordSink};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub family_id: String,
    #[serde(flatten)]
    pub record: FinishedSessionRecord,
}

#[derive(Clone, Debug)]
pub struct Leaderboard {
    path: PathBuf,
}

impl Leaderboard {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &LeaderboardEntry) -> Result<(), PersistenceError> {
        if entry.family_id.trim().is_empty() {
            return Err(PersistenceError::Rejected("missing family id".to_string()));
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Every readable entry; a missing file is an empty board and malformed
    /// lines are skipped.
    pub fn entries(&self) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LeaderboardEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => log(&format!(
                    "skipping leaderboard line {} in {}: {}",
                    lineno + 1,
                    self.path.display(),
                    e
                )),
            }
        }
        Ok(entries)
    }

    /// Top `limit` games for a family, highest score first.
    pub fn best_for_family(&self, family_id: &str, limit: usize) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
        let mut entries: Vec<_> = self
            .entries()?
            .into_iter()
            .filter(|e| e.family_id == family_id)
            .collect();
        rank(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    pub fn best_for_player(
        &self,
        family_id: &str,
        player_name: &str,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
        let mut entries: Vec<_> = self
            .entries()?
            .into_iter()
            .filter(|e| e.family_id == family_id && e.record.player_name == player_name)
            .collect();
        rank(&mut entries);
        entries.truncate(limit);
        Ok(entries)
    }

    /// Sink that files every record under `family_id`.
    pub fn sink(&self, family_id: impl Into<String>) -> LeaderboardSink {
        LeaderboardSink {
            board: self.clone(),
            family_id: family_id.into(),
        }
    }
}

/// Score descending; earlier entries win ties.
fn rank(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| b.record.score.cmp(&a.record.score));
}

pub struct LeaderboardSink {
    board: Leaderboard,
    family_id: String,
}

impl RecordSink for LeaderboardSink {
    fn submit(&mut self, record: &FinishedSessionRecord) -> Result<(), PersistenceError> {
        self.board.append(&LeaderboardEntry {
            family_id: self.family_id.clone(),
            record: record.clone(),
        })
    }
}

/// Largest record body the HTTP API accepts.
pub const MAX_RECORD_BYTES: u64 = 16 * 1024;

const FAMILY_LIMIT: usize = 1;
const PLAYER_LIMIT: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("missing family")]
    MissingFamily,
    #[error("record body is too large")]
    BodyTooLarge,
    #[error("unreadable body: {0}")]
    UnreadableBody(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            ApiError::NotFound => 404,
            ApiError::BodyTooLarge => 413,
            ApiError::MissingFamily | ApiError::UnreadableBody(_) | ApiError::InvalidRecord(_) => 400,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub family_id: String,
    pub player: Option<String>,
    pub limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiRoute {
    SubmitRecord { family_id: String },
    Query(LeaderboardQuery),
}

/// Decoded value of the first non-empty `key`.
pub fn query_param(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

/// Resolves an `/api/...` request. Unknown routes are `NotFound` before any
/// parameter is looked at.
pub fn route(method: &str, path: &str, query: &str) -> Result<ApiRoute, ApiError> {
    match (method, path) {
        ("POST", "/api/records") => {
            let family_id = query_param(query, "family").ok_or(ApiError::MissingFamily)?;
            Ok(ApiRoute::SubmitRecord { family_id })
        }
        ("GET", "/api/leaderboard") => {
            let family_id = query_param(query, "family").ok_or(ApiError::MissingFamily)?;
            let player = query_param(query, "player");
            let default_limit = if player.is_some() { PLAYER_LIMIT } else { FAMILY_LIMIT };
            let limit = query_param(query, "limit")
                .and_then(|l| l.parse::<usize>().ok())
                .unwrap_or(default_limit);
            Ok(ApiRoute::Query(LeaderboardQuery {
                family_id,
                player,
                limit,
            }))
        }
        _ => Err(ApiError::NotFound),
    }
}

/// Reads at most `MAX_RECORD_BYTES` from `body` and decodes one record.
pub fn read_record(body: impl Read) -> Result<FinishedSessionRecord, ApiError> {
    let mut raw = String::new();
    body.take(MAX_RECORD_BYTES + 1)
        .read_to_string(&mut raw)
        .map_err(|e| ApiError::UnreadableBody(e.to_string()))?;
    if raw.len() as u64 > MAX_RECORD_BYTES {
        return Err(ApiError::BodyTooLarge);
    }
    serde_json::from_str(&raw).map_err(|e| ApiError::InvalidRecord(e.to_string()))
}

impl Leaderboard {
    pub fn run_query(&self, query: &LeaderboardQuery) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
        match &query.player {
            Some(name) => self.best_for_player(&query.family_id, name, query.limit),
            None => self.best_for_family(&query.family_id, query.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::GAME_MODE;

    fn temp_board(name: &str) -> Leaderboard {
        let dir = std::env::temp_dir().join(format!("cattetris-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        Leaderboard::open(dir.join("scores.jsonl"))
    }

    fn record(player: &str, score: u32) -> FinishedSessionRecord {
        FinishedSessionRecord {
            player_name: player.to_string(),
            score,
            level: 1,
            lines_cleared: score / 10,
            pieces_placed: 10,
            game_duration_seconds: 60,
            game_mode: GAME_MODE.to_string(),
        }
    }

    #[test]
    fn missing_file_is_empty() {
        let board = temp_board("missing");
        assert!(board.entries().unwrap().is_empty());
        assert!(board.best_for_family("f1", 1).unwrap().is_empty());
    }

    #[test]
    fn queries_rank_by_score_within_family() {
        let board = temp_board("rank");
        let mut sink = board.sink("f1");
        sink.submit(&record("Mia", 50)).unwrap();
        sink.submit(&record("Leo", 120)).unwrap();
        sink.submit(&record("Mia", 90)).unwrap();
        board.sink("f2").submit(&record("Zoe", 500)).unwrap();

        let family = board.best_for_family("f1", 1).unwrap();
        assert_eq!(family.len(), 1);
        assert_eq!(family[0].record.player_name, "Leo");

        let mia: Vec<_> = board
            .best_for_player("f1", "Mia", 10)
            .unwrap()
            .into_iter()
            .map(|e| e.record.score)
            .collect();
        assert_eq!(mia, vec![90, 50]);
        assert!(board.best_for_player("f1", "Zoe", 10).unwrap().is_empty());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let board = temp_board("malformed");
        board.sink("f1").submit(&record("Mia", 10)).unwrap();
        let mut file = OpenOptions::new().append(true).open(board.path()).unwrap();
        writeln!(file, "{{not json").unwrap();
        board.sink("f1").submit(&record("Leo", 20)).unwrap();
        assert_eq!(board.entries().unwrap().len(), 2);
    }

    #[test]
    fn entries_store_flat_record_fields() {
        let board = temp_board("flat");
        board.sink("f9").submit(&record("Mia", 30)).unwrap();
        let raw = fs::read_to_string(board.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value["family_id"], "f9");
        assert_eq!(value["player_name"], "Mia");
        assert_eq!(value["score"], 30);
    }

    #[test]
    fn blank_family_is_rejected() {
        let board = temp_board("blank");
        let err = board.sink("  ").submit(&record("Mia", 1)).unwrap_err();
        assert!(matches!(err, PersistenceError::Rejected(_)));
    }

    #[test]
    fn query_params_are_percent_and_plus_decoded() {
        let query = "family=f%201&player=%D0%9C%D0%B0%D0%BC%D0%B0%20%D0%90%D0%BD%D1%8F&note=a+b";
        assert_eq!(query_param(query, "family").as_deref(), Some("f 1"));
        assert_eq!(query_param(query, "player").as_deref(), Some("Мама Аня"));
        assert_eq!(query_param(query, "note").as_deref(), Some("a b"));
        assert_eq!(query_param("family=", "family"), None);
        assert_eq!(query_param("", "family"), None);
    }

    #[test]
    fn encoded_player_name_finds_stored_games() {
        let board = temp_board("encoded");
        board.sink("f1").submit(&record("Мама Аня", 70)).unwrap();
        board.sink("f1").submit(&record("Leo", 90)).unwrap();

        let query = "family=f1&player=%D0%9C%D0%B0%D0%BC%D0%B0%20%D0%90%D0%BD%D1%8F";
        let ApiRoute::Query(q) = route("GET", "/api/leaderboard", query).unwrap() else {
            panic!("expected a leaderboard query");
        };
        let hits = board.run_query(&q).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.player_name, "Мама Аня");
    }

    #[test]
    fn leaderboard_limit_defaults_depend_on_player() {
        let family = route("GET", "/api/leaderboard", "family=f1").unwrap();
        assert_eq!(
            family,
            ApiRoute::Query(LeaderboardQuery {
                family_id: "f1".to_string(),
                player: None,
                limit: 1,
            })
        );

        let ApiRoute::Query(player) = route("GET", "/api/leaderboard", "family=f1&player=Mia").unwrap() else {
            panic!("expected a leaderboard query");
        };
        assert_eq!(player.limit, 10);

        let ApiRoute::Query(explicit) = route("GET", "/api/leaderboard", "family=f1&limit=5").unwrap() else {
            panic!("expected a leaderboard query");
        };
        assert_eq!(explicit.limit, 5);

        let ApiRoute::Query(garbage) = route("GET", "/api/leaderboard", "family=f1&limit=lots").unwrap() else {
            panic!("expected a leaderboard query");
        };
        assert_eq!(garbage.limit, 1);
    }

    #[test]
    fn routes_resolve_before_family_is_required() {
        assert_eq!(route("GET", "/api/unknown", ""), Err(ApiError::NotFound));
        assert_eq!(route("DELETE", "/api/records", "family=f1"), Err(ApiError::NotFound));
        assert_eq!(route("GET", "/api/records", "family=f1"), Err(ApiError::NotFound));
        assert_eq!(route("POST", "/api/records", ""), Err(ApiError::MissingFamily));
        assert_eq!(route("GET", "/api/leaderboard", "player=Mia"), Err(ApiError::MissingFamily));
        assert_eq!(
            route("POST", "/api/records", "family=f2"),
            Ok(ApiRoute::SubmitRecord {
                family_id: "f2".to_string()
            })
        );
        assert_eq!(ApiError::NotFound.status(), 404);
        assert_eq!(ApiError::MissingFamily.status(), 400);
    }

    #[test]
    fn record_bodies_are_decoded_and_capped() {
        let body = serde_json::to_string(&record("Mia", 40)).unwrap();
        let parsed = read_record(body.as_bytes()).unwrap();
        assert_eq!(parsed, record("Mia", 40));

        let err = read_record("{not json".as_bytes()).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRecord(_)));
        assert_eq!(err.status(), 400);

        let missing_field = read_record(r#"{"player_name":"Mia"}"#.as_bytes()).unwrap_err();
        assert!(matches!(missing_field, ApiError::InvalidRecord(_)));

        let huge = vec![b' '; MAX_RECORD_BYTES as usize + 1];
        let err = read_record(huge.as_slice()).unwrap_err();
        assert_eq!(err, ApiError::BodyTooLarge);
        assert_eq!(err.status(), 413);
    }
}
