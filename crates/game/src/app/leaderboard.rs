use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::atomic_io::replace_file_atomic;

pub(crate) const LEADERBOARD_FILE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ScoreRecord {
    pub(crate) player_id: String,
    pub(crate) display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) avatar_url: Option<String>,
    pub(crate) score: u64,
    pub(crate) timestamp_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ArchivedRecord {
    #[serde(flatten)]
    pub(crate) record: ScoreRecord,
    pub(crate) archived_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SubmitReceipt {
    /// Standing of the submitting player's best score after the submission.
    pub(crate) rank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlayerStanding {
    pub(crate) best: ScoreRecord,
    pub(crate) rank: usize,
}

#[derive(Debug, Error)]
pub(crate) enum LeaderboardError {
    #[error("score record rejected: {field} must not be empty")]
    InvalidRecord { field: &'static str },
    #[error("failed to read leaderboard '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse leaderboard '{path}' at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported leaderboard version {found} in '{path}' (expected {expected})")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("failed to encode leaderboard: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write leaderboard '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Score storage consulted after each run.
pub(crate) trait Leaderboard {
    fn submit(&mut self, record: ScoreRecord) -> Result<SubmitReceipt, LeaderboardError>;

    /// Active records, highest score first.
    fn top(&self, limit: usize) -> Vec<ScoreRecord>;

    /// The player's best active record and its rank: one more than the number
    /// of active records with a strictly higher score.
    fn player_standing(&self, player_id: &str) -> Option<PlayerStanding>;

    /// Moves records older than `cutoff_ms` to the archive. Returns how many
    /// moved.
    fn archive_older_than(&mut self, cutoff_ms: u64) -> Result<usize, LeaderboardError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LeaderboardFile {
    version: u32,
    #[serde(default)]
    records: Vec<ScoreRecord>,
    #[serde(default)]
    archived: Vec<ArchivedRecord>,
}

/// Leaderboard persisted as one JSON document, rewritten atomically on every
/// change.
#[derive(Debug)]
pub(crate) struct JsonFileLeaderboard {
    path: PathBuf,
    data: LeaderboardFile,
}

impl JsonFileLeaderboard {
    /// Opens the leaderboard at `path`. A missing file is an empty board.
    pub(crate) fn open(path: impl Into<PathBuf>) -> Result<Self, LeaderboardError> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(raw) => parse_leaderboard(&path, &raw)?,
            Err(source) if source.kind() == io::ErrorKind::NotFound => LeaderboardFile {
                version: LEADERBOARD_FILE_VERSION,
                ..LeaderboardFile::default()
            },
            Err(source) => return Err(LeaderboardError::Read { path, source }),
        };
        Ok(Self { path, data })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn archived(&self) -> &[ArchivedRecord] {
        &self.data.archived
    }

    fn save(&self) -> Result<(), LeaderboardError> {
        let json = serde_json::to_vec_pretty(&self.data).map_err(LeaderboardError::Encode)?;
        replace_file_atomic(&self.path, &json).map_err(|source| LeaderboardError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn best_for(&self, player_id: &str) -> Option<&ScoreRecord> {
        self.data
            .records
            .iter()
            .filter(|record| record.player_id == player_id)
            .max_by_key(|record| record.score)
    }
}

impl Leaderboard for JsonFileLeaderboard {
    fn submit(&mut self, record: ScoreRecord) -> Result<SubmitReceipt, LeaderboardError> {
        validate_record(&record)?;
        let player_id = record.player_id.clone();
        self.data.records.push(record);
        if let Err(error) = self.save() {
            self.data.records.pop();
            return Err(error);
        }
        let rank = self
            .player_standing(&player_id)
            .map(|standing| standing.rank)
            .unwrap_or(1);
        Ok(SubmitReceipt { rank })
    }

    fn top(&self, limit: usize) -> Vec<ScoreRecord> {
        let mut records = self.data.records.clone();
        // Stable sort keeps earlier submissions ahead on ties.
        records.sort_by(|a, b| b.score.cmp(&a.score));
        records.truncate(limit);
        records
    }

    fn player_standing(&self, player_id: &str) -> Option<PlayerStanding> {
        let best = self.best_for(player_id)?.clone();
        let higher = self
            .data
            .records
            .iter()
            .filter(|record| record.score > best.score)
            .count();
        Some(PlayerStanding {
            best,
            rank: higher + 1,
        })
    }

    fn archive_older_than(&mut self, cutoff_ms: u64) -> Result<usize, LeaderboardError> {
        let (stale, fresh): (Vec<_>, Vec<_>) = self
            .data
            .records
            .iter()
            .cloned()
            .partition(|record| record.timestamp_ms < cutoff_ms);
        if stale.is_empty() {
            return Ok(0);
        }

        let previous = self.data.clone();
        let archived_at_ms = super::now_ms();
        let moved = stale.len();
        self.data.records = fresh;
        self.data
            .archived
            .extend(stale.into_iter().map(|record| ArchivedRecord {
                record,
                archived_at_ms,
            }));
        if let Err(error) = self.save() {
            self.data = previous;
            return Err(error);
        }
        info!(moved, cutoff_ms, "leaderboard_archived");
        Ok(moved)
    }
}

fn validate_record(record: &ScoreRecord) -> Result<(), LeaderboardError> {
    if record.player_id.trim().is_empty() {
        return Err(LeaderboardError::InvalidRecord { field: "player_id" });
    }
    if record.display_name.trim().is_empty() {
        return Err(LeaderboardError::InvalidRecord {
            field: "display_name",
        });
    }
    Ok(())
}

fn parse_leaderboard(path: &Path, raw: &str) -> Result<LeaderboardFile, LeaderboardError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let data: LeaderboardFile = serde_path_to_error::deserialize(&mut deserializer).map_err(
        |error| {
            let field = error.path().to_string();
            LeaderboardError::Parse {
                path: path.to_path_buf(),
                field,
                source: error.into_inner(),
            }
        },
    )?;
    if data.version != LEADERBOARD_FILE_VERSION {
        return Err(LeaderboardError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: data.version,
            expected: LEADERBOARD_FILE_VERSION,
        });
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn record(player_id: &str, score: u64, timestamp_ms: u64) -> ScoreRecord {
        ScoreRecord {
            player_id: player_id.to_string(),
            display_name: format!("{player_id} name"),
            avatar_url: None,
            score,
            timestamp_ms,
        }
    }

    fn open_in(dir: &TempDir) -> JsonFileLeaderboard {
        JsonFileLeaderboard::open(dir.path().join("board.json")).expect("open leaderboard")
    }

    #[test]
    fn missing_file_opens_empty() {
        let dir = TempDir::new().expect("temp dir");
        let board = open_in(&dir);
        assert!(board.top(10).is_empty());
        assert!(board.player_standing("anyone").is_none());
    }

    #[test]
    fn top_orders_by_score_descending() {
        let dir = TempDir::new().expect("temp dir");
        let mut board = open_in(&dir);
        board.submit(record("a", 10, 1)).expect("submit a");
        board.submit(record("b", 30, 2)).expect("submit b");
        board.submit(record("c", 20, 3)).expect("submit c");

        let scores: Vec<u64> = board.top(2).iter().map(|entry| entry.score).collect();
        assert_eq!(scores, vec![30, 20]);
    }

    #[test]
    fn rank_counts_strictly_higher_records() {
        let dir = TempDir::new().expect("temp dir");
        let mut board = open_in(&dir);
        board.submit(record("a", 50, 1)).expect("submit");
        board.submit(record("b", 50, 2)).expect("submit");
        board.submit(record("c", 70, 3)).expect("submit");
        let receipt = board.submit(record("d", 40, 4)).expect("submit");

        assert_eq!(receipt.rank, 4);
        let standing = board.player_standing("b").expect("standing");
        assert_eq!(standing.rank, 2);
        assert_eq!(standing.best.score, 50);
    }

    #[test]
    fn standing_uses_players_best_score() {
        let dir = TempDir::new().expect("temp dir");
        let mut board = open_in(&dir);
        board.submit(record("a", 5, 1)).expect("submit");
        board.submit(record("a", 90, 2)).expect("submit");
        board.submit(record("b", 60, 3)).expect("submit");

        let standing = board.player_standing("a").expect("standing");
        assert_eq!(standing.best.score, 90);
        assert_eq!(standing.rank, 1);
    }

    #[test]
    fn empty_identity_is_rejected_and_not_stored() {
        let dir = TempDir::new().expect("temp dir");
        let mut board = open_in(&dir);

        let mut nameless = record("a", 10, 1);
        nameless.display_name = "  ".to_string();
        assert!(matches!(
            board.submit(nameless),
            Err(LeaderboardError::InvalidRecord {
                field: "display_name"
            })
        ));
        assert!(matches!(
            board.submit(record("", 10, 1)),
            Err(LeaderboardError::InvalidRecord { field: "player_id" })
        ));
        assert!(board.top(10).is_empty());
        assert!(!board.path().exists());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let mut board = open_in(&dir);
        let mut with_avatar = record("a", 12, 1);
        with_avatar.avatar_url = Some("https://example.invalid/a.png".to_string());
        board.submit(with_avatar.clone()).expect("submit");

        let reopened = open_in(&dir);
        assert_eq!(reopened.top(1), vec![with_avatar]);
    }

    #[test]
    fn archive_moves_only_stale_records() {
        let dir = TempDir::new().expect("temp dir");
        let mut board = open_in(&dir);
        board.submit(record("old", 100, 1_000)).expect("submit");
        board.submit(record("new", 10, 9_000)).expect("submit");

        let moved = board.archive_older_than(5_000).expect("archive");

        assert_eq!(moved, 1);
        assert_eq!(board.top(10), vec![record("new", 10, 9_000)]);
        assert_eq!(board.archived().len(), 1);
        assert_eq!(board.archived()[0].record.player_id, "old");
        assert!(board.archived()[0].archived_at_ms > 0);
        assert!(board.player_standing("old").is_none());

        let reopened = open_in(&dir);
        assert_eq!(reopened.archived().len(), 1);
        assert_eq!(board.archive_older_than(5_000).expect("second pass"), 0);
    }

    #[test]
    fn parse_error_names_the_field() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("board.json");
        fs::write(
            &path,
            r#"{"version":1,"records":[{"player_id":"a","display_name":"A","score":"lots","timestamp_ms":1}]}"#,
        )
        .expect("write fixture");

        let error = JsonFileLeaderboard::open(&path).expect_err("bad score type");
        match error {
            LeaderboardError::Parse { field, .. } => assert_eq!(field, "records[0].score"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("board.json");
        fs::write(&path, r#"{"version":7}"#).expect("write fixture");

        assert!(matches!(
            JsonFileLeaderboard::open(&path),
            Err(LeaderboardError::UnsupportedVersion { found: 7, .. })
        ));
    }
}
