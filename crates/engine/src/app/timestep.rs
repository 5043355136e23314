use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Fixed-timestep accumulator driven by a tick rate. Elapsed wall time is
/// banked as `nanoseconds * rate_hz`, and one tick is released per
/// `1e9` banked units, so `T` of elapsed time releases exactly
/// `floor(T * rate_hz)` ticks however it was chunked.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    rate_hz: u128,
    banked: u128,
}

impl FixedTimestep {
    pub fn new(tick_rate_hz: u32) -> Self {
        Self {
            rate_hz: u128::from(tick_rate_hz.max(1)),
            banked: 0,
        }
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.rate_hz as u32
    }

    /// Leftover time not yet converted into a full tick, rounded down to
    /// whole nanoseconds.
    pub fn pending(&self) -> Duration {
        let nanos = self.banked / self.rate_hz;
        Duration::from_nanos(nanos.min(u128::from(u64::MAX)) as u64)
    }

    /// Banks `elapsed` and returns how many whole ticks are now due.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.banked = self
            .banked
            .saturating_add(elapsed.as_nanos().saturating_mul(self.rate_hz));
        let due = self.banked / NANOS_PER_SEC;
        let ticks_to_run = due.min(u128::from(u32::MAX));
        self.banked -= ticks_to_run * NANOS_PER_SEC;
        ticks_to_run as u32
    }

    pub fn reset(&mut self) {
        self.banked = 0;
    }
}

pub(crate) fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps
        .filter(|fps| *fps > 0)
        .map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

pub(crate) fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_in_chunks(timestep: &mut FixedTimestep, total: Duration, chunk: Duration) -> u32 {
        let mut ticks = 0;
        let mut fed = Duration::ZERO;
        while fed < total {
            let step = chunk.min(total - fed);
            ticks += timestep.advance(step);
            fed += step;
        }
        ticks
    }

    #[test]
    fn runs_expected_ticks_and_keeps_remainder() {
        let mut timestep = FixedTimestep::new(100);
        assert_eq!(timestep.advance(Duration::from_millis(35)), 3);
        assert_eq!(timestep.pending(), Duration::from_millis(5));
        assert_eq!(timestep.advance(Duration::from_millis(5)), 1);
        assert_eq!(timestep.pending(), Duration::ZERO);
    }

    #[test]
    fn whole_seconds_at_sixty_hz_release_exact_tick_counts() {
        let mut one_second = FixedTimestep::new(60);
        assert_eq!(one_second.advance(Duration::from_secs(1)), 60);
        assert_eq!(one_second.pending(), Duration::ZERO);

        let mut three_seconds = FixedTimestep::new(60);
        assert_eq!(three_seconds.advance(Duration::from_secs(3)), 180);

        let mut chunked_one = FixedTimestep::new(60);
        assert_eq!(
            feed_in_chunks(&mut chunked_one, Duration::from_secs(1), Duration::from_millis(1)),
            60
        );

        let mut chunked_three = FixedTimestep::new(60);
        assert_eq!(
            feed_in_chunks(&mut chunked_three, Duration::from_secs(3), Duration::from_millis(1)),
            180
        );
    }

    #[test]
    fn one_burst_equals_uneven_increments() {
        let total = Duration::from_millis(2_500);

        let mut burst = FixedTimestep::new(60);
        let burst_ticks = burst.advance(total);

        let mut uneven = FixedTimestep::new(60);
        let mut uneven_ticks = 0;
        let mut fed = Duration::ZERO;
        let steps = [
            Duration::from_micros(3_100),
            Duration::from_micros(41_700),
            Duration::from_nanos(999),
            Duration::from_millis(250),
        ];
        let mut index = 0;
        while fed < total {
            let chunk = steps[index % steps.len()].min(total - fed);
            uneven_ticks += uneven.advance(chunk);
            fed += chunk;
            index += 1;
        }

        assert_eq!(burst_ticks, 150);
        assert_eq!(uneven_ticks, 150);
        assert_eq!(burst.pending(), uneven.pending());
    }

    #[test]
    fn partial_tick_stays_banked() {
        let mut timestep = FixedTimestep::new(60);
        assert_eq!(timestep.advance(Duration::from_millis(16)), 0);
        assert_eq!(timestep.advance(Duration::from_millis(1)), 1);
        timestep.reset();
        assert_eq!(timestep.pending(), Duration::ZERO);
    }

    #[test]
    fn slow_frame_catches_up_instead_of_dropping_time() {
        let mut timestep = FixedTimestep::new(100);
        assert_eq!(timestep.advance(Duration::from_secs(2)), 200);
    }

    #[test]
    fn zero_elapsed_runs_nothing() {
        let mut timestep = FixedTimestep::new(60);
        assert_eq!(timestep.advance(Duration::ZERO), 0);
    }

    #[test]
    fn zero_rate_is_normalized() {
        let timestep = FixedTimestep::new(0);
        assert_eq!(timestep.tick_rate_hz(), 1);
    }

    #[test]
    fn target_frame_duration_none_when_cap_off_or_zero() {
        assert_eq!(target_frame_duration(None), None);
        assert_eq!(target_frame_duration(Some(0)), None);
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), target_frame_duration(Some(60)));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_under_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(5), target_frame_duration(Some(60)));
        assert!(sleep > Duration::ZERO);
    }
}
