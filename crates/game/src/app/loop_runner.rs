use std::process::ExitCode;

use engine::{run_app, ChannelGameEndSink};
use tracing::{error, warn};

use super::bootstrap::AppWiring;
use super::scores::spawn_score_recorder;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let (sink, receiver) = ChannelGameEndSink::new();
    let recorder = match spawn_score_recorder(receiver, app.leaderboard, app.player) {
        Ok(handle) => handle,
        Err(err) => {
            error!(error = %err, "score_recorder_spawn_failed");
            return ExitCode::FAILURE;
        }
    };

    // The sink is dropped with the controller when `run_app` returns, which
    // ends the recorder loop.
    let result = run_app(app.config, Box::new(sink));
    if recorder.join().is_err() {
        warn!("score_recorder_panicked");
    }

    if let Err(err) = result {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
