use std::io;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use engine::GameEnded;
use tracing::{info, warn};

use super::leaderboard::{Leaderboard, LeaderboardError, ScoreRecord, SubmitReceipt};
use super::now_ms;

const RECORDER_THREAD_NAME: &str = "dodge-scores";
const TOP_ENTRIES_LOGGED: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlayerIdentity {
    pub(crate) player_id: String,
    pub(crate) display_name: String,
    pub(crate) avatar_url: Option<String>,
}

/// Drains game-over notifications on its own thread and records each final
/// score. The thread ends once every sender is gone.
pub(crate) fn spawn_score_recorder<L>(
    receiver: Receiver<GameEnded>,
    mut leaderboard: L,
    player: PlayerIdentity,
) -> io::Result<JoinHandle<()>>
where
    L: Leaderboard + Send + 'static,
{
    thread::Builder::new()
        .name(RECORDER_THREAD_NAME.to_owned())
        .spawn(move || {
            for event in receiver {
                match record_game_end(&mut leaderboard, &player, event, now_ms()) {
                    Ok(receipt) => log_standings(&leaderboard, event, receipt),
                    Err(error) => {
                        warn!(session = event.session.0, error = %error, "score_submit_failed")
                    }
                }
            }
            info!("score_recorder_stopped");
        })
}

pub(crate) fn record_game_end(
    leaderboard: &mut dyn Leaderboard,
    player: &PlayerIdentity,
    event: GameEnded,
    timestamp_ms: u64,
) -> Result<SubmitReceipt, LeaderboardError> {
    leaderboard.submit(ScoreRecord {
        player_id: player.player_id.clone(),
        display_name: player.display_name.clone(),
        avatar_url: player.avatar_url.clone(),
        score: event.final_score,
        timestamp_ms,
    })
}

fn log_standings(leaderboard: &dyn Leaderboard, event: GameEnded, receipt: SubmitReceipt) {
    info!(
        session = event.session.0,
        final_score = event.final_score,
        rank = receipt.rank,
        "score_recorded"
    );
    for (position, entry) in leaderboard.top(TOP_ENTRIES_LOGGED).iter().enumerate() {
        info!(
            position = position + 1,
            player = entry.display_name.as_str(),
            score = entry.score,
            "leaderboard_entry"
        );
    }
}

#[cfg(test)]
mod tests {
    use engine::{ChannelGameEndSink, GameEndSink, SessionId};
    use tempfile::TempDir;

    use super::*;
    use crate::app::leaderboard::JsonFileLeaderboard;

    fn player() -> PlayerIdentity {
        PlayerIdentity {
            player_id: "p1".to_string(),
            display_name: "Pat".to_string(),
            avatar_url: None,
        }
    }

    #[test]
    fn game_end_becomes_a_score_record() {
        let dir = TempDir::new().expect("temp dir");
        let mut board =
            JsonFileLeaderboard::open(dir.path().join("board.json")).expect("open leaderboard");
        let event = GameEnded {
            session: SessionId(3),
            final_score: 77,
        };

        let receipt = record_game_end(&mut board, &player(), event, 1_234).expect("submit");

        assert_eq!(receipt.rank, 1);
        let top = board.top(1);
        assert_eq!(top[0].score, 77);
        assert_eq!(top[0].timestamp_ms, 1_234);
        assert_eq!(top[0].display_name, "Pat");
    }

    #[test]
    fn recorder_persists_every_event_then_exits() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("board.json");
        let board = JsonFileLeaderboard::open(&path).expect("open leaderboard");
        let (mut sink, receiver) = ChannelGameEndSink::new();

        let handle = spawn_score_recorder(receiver, board, player()).expect("spawn recorder");
        sink.game_ended(GameEnded {
            session: SessionId(1),
            final_score: 12,
        });
        sink.game_ended(GameEnded {
            session: SessionId(2),
            final_score: 40,
        });
        drop(sink);
        handle.join().expect("recorder thread");

        let reopened = JsonFileLeaderboard::open(&path).expect("reopen");
        let scores: Vec<u64> = reopened.top(10).iter().map(|entry| entry.score).collect();
        assert_eq!(scores, vec![40, 12]);
        let standing = reopened.player_standing("p1").expect("standing");
        assert_eq!(standing.best.score, 40);
    }
}
