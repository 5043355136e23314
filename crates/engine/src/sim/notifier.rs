use std::sync::mpsc::{self, Receiver, Sender};

use tracing::warn;

/// Monotonic id of a run, bumped on every start/restart of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameEnded {
    pub session: SessionId,
    pub final_score: u64,
}

/// Receives the terminal score of each session.
///
/// Called on the simulation thread, at most once per session. Implementations
/// that touch state owned by another thread must hand the event over to that
/// thread themselves; [`ChannelGameEndSink`] does exactly that.
pub trait GameEndSink: Send {
    fn game_ended(&mut self, event: GameEnded);
}

impl<F> GameEndSink for F
where
    F: FnMut(GameEnded) + Send,
{
    fn game_ended(&mut self, event: GameEnded) {
        self(event)
    }
}

/// Forwards game-end events over an mpsc channel to whichever thread owns
/// the receiving end.
#[derive(Debug)]
pub struct ChannelGameEndSink {
    sender: Sender<GameEnded>,
}

impl ChannelGameEndSink {
    pub fn new() -> (Self, Receiver<GameEnded>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl GameEndSink for ChannelGameEndSink {
    fn game_ended(&mut self, event: GameEnded) {
        if self.sender.send(event).is_err() {
            warn!(
                session = event.session.0,
                final_score = event.final_score,
                "game_end_receiver_dropped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_sink_delivers_event_to_receiver() {
        let (mut sink, receiver) = ChannelGameEndSink::new();
        let event = GameEnded {
            session: SessionId(3),
            final_score: 99,
        };
        sink.game_ended(event);

        assert_eq!(receiver.try_recv().expect("event"), event);
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (mut sink, receiver) = ChannelGameEndSink::new();
        drop(receiver);
        sink.game_ended(GameEnded {
            session: SessionId(1),
            final_score: 1,
        });
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: GameEnded| seen.push(event.final_score);
            sink.game_ended(GameEnded {
                session: SessionId(0),
                final_score: 5,
            });
        }
        assert_eq!(seen, vec![5]);
    }
}
