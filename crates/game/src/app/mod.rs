mod atomic_io;
mod bootstrap;
mod leaderboard;
mod loop_runner;
mod scores;

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;

/// Wall-clock milliseconds since the Unix epoch; 0 if the clock is before it.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
