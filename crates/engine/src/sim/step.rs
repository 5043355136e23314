use tracing::{debug, info};

use crate::config::{ConfigError, EngineConfig, Viewport};

use super::collision::first_collision;
use super::notifier::{GameEndSink, GameEnded, SessionId};
use super::spawner::{SpawnDecision, Spawner};
use super::world::{RunFlag, Session};

/// Input sampled once at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// -1.0 steers left, 1.0 steers right, 0.0 holds the lane.
    pub steer: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Survived { score: u64 },
    Collided { final_score: u64 },
    /// The session was not running; nothing changed.
    Halted,
}

/// A session plus everything needed to advance it: spawner, end-of-game
/// sink and the config it was built from.
pub struct Simulation {
    config: EngineConfig,
    session: Session,
    spawner: Spawner,
    sink: Box<dyn GameEndSink>,
    session_id: SessionId,
    seed: u64,
}

impl Simulation {
    pub fn new(config: EngineConfig, sink: Box<dyn GameEndSink>) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.rng_seed.unwrap_or_else(rand::random);
        let session = Session::new(&config, RunFlag::default());
        let spawner = Spawner::new(&config, seed);
        Ok(Self {
            config,
            session,
            spawner,
            sink,
            session_id: SessionId::default(),
            seed,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn run_flag(&self) -> RunFlag {
        self.session.run_flag.clone()
    }

    /// Applies a new playfield size. Only valid between sessions; the session
    /// is reset so spawn bounds and the vehicle position follow the viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.viewport = viewport;
        config.validate()?;
        self.config = config;
        self.session.reset(&self.config);
        self.spawner = Spawner::new(&self.config, self.seed);
        Ok(())
    }

    /// Resets the session and marks it running. A configured seed makes every
    /// session replay the same obstacle stream; otherwise each session draws
    /// a fresh seed.
    pub fn begin_session(&mut self) {
        self.session.reset(&self.config);
        self.seed = self.config.rng_seed.unwrap_or_else(rand::random);
        self.spawner = Spawner::new(&self.config, self.seed);
        self.session_id = SessionId(self.session_id.0.wrapping_add(1));
        self.session.run_flag.set();
        info!(
            session = self.session_id.0,
            seed = self.seed,
            viewport_width = self.config.viewport.width,
            viewport_height = self.config.viewport.height,
            "session_started"
        );
    }

    /// Advances the session by exactly one fixed tick.
    pub fn step(&mut self, input: &TickInput) -> StepOutcome {
        if !self.session.is_running() {
            return StepOutcome::Halted;
        }
        let dt = self.config.tick_seconds();
        self.session.ticks = self.session.ticks.saturating_add(1);

        self.steer_vehicle(input.steer, dt);

        for obstacle in &mut self.session.obstacles {
            obstacle.advance(dt);
        }
        self.scroll_road_markings(dt);

        match self.spawner.decide(self.session.obstacles.len()) {
            SpawnDecision::Spawn { x } => {
                let obstacle = self.spawner.obstacle_at(x);
                self.session.obstacles.push(obstacle);
            }
            SpawnDecision::SkipCapacity => {
                debug!(
                    active = self.session.obstacles.len(),
                    "spawn_skipped_capacity"
                );
            }
            SpawnDecision::SkipProbability => {}
        }

        let viewport = self.session.viewport;
        self.session
            .obstacles
            .retain(|obstacle| !obstacle.is_past_trailing_edge(viewport));

        let vehicle_bounds = self.session.vehicle.bounds();
        if first_collision(vehicle_bounds, &self.session.obstacles).is_some() {
            let final_score = self.session.score;
            self.end_session(final_score);
            return StepOutcome::Collided { final_score };
        }

        self.session.score = self.session.score.saturating_add(1);
        StepOutcome::Survived {
            score: self.session.score,
        }
    }

    fn end_session(&mut self, final_score: u64) {
        self.session.run_flag.clear();
        if self.session.end_notified {
            return;
        }
        self.session.end_notified = true;
        info!(
            session = self.session_id.0,
            final_score,
            ticks = self.session.ticks,
            "game_over"
        );
        self.sink.game_ended(GameEnded {
            session: self.session_id,
            final_score,
        });
    }

    fn steer_vehicle(&mut self, steer: f32, dt: f32) {
        let direction = steer.clamp(-1.0, 1.0);
        if direction == 0.0 || self.config.steer_speed_px_per_sec == 0.0 {
            return;
        }
        let vehicle = &mut self.session.vehicle;
        let max_x = (self.session.viewport.width as f32 - vehicle.size.width).max(0.0);
        let next_x = vehicle.position.x + direction * self.config.steer_speed_px_per_sec * dt;
        vehicle.position.x = next_x.clamp(0.0, max_x);
    }

    fn scroll_road_markings(&mut self, dt: f32) {
        let markings = self.config.road_markings;
        let period = markings.dash_length + markings.dash_gap;
        if period <= 0.0 {
            return;
        }
        let distance = self.config.obstacle_speed_px_per_sec * dt;
        for marking in &mut self.session.road_markings {
            marking.offset = (marking.offset + distance).rem_euclid(period);
        }
    }

    #[cfg(test)]
    pub(crate) fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("session_id", &self.session_id)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
