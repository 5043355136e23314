use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::config::{EngineConfig, EntitySize, Viewport};

use super::world::{Obstacle, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpawnDecision {
    Spawn { x: f32 },
    SkipProbability,
    SkipCapacity,
}

/// Per-tick obstacle generator. Owns its RNG so a seed reproduces the
/// whole obstacle stream of a session.
#[derive(Debug, Clone)]
pub struct Spawner {
    rng: Pcg32,
    probability: f64,
    max_active: Option<usize>,
    spawn_y: f32,
    obstacle_size: EntitySize,
    obstacle_speed: f32,
    max_x: f32,
}

impl Spawner {
    pub fn new(config: &EngineConfig, seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            probability: config.spawn_probability,
            max_active: config.max_active_obstacles,
            spawn_y: config.obstacle_spawn_y,
            obstacle_size: config.obstacle_size,
            obstacle_speed: config.obstacle_speed_px_per_sec,
            max_x: spawn_range_end(config.viewport, config.obstacle_size),
        }
    }

    pub fn decide(&mut self, active_obstacles: usize) -> SpawnDecision {
        // Roll first so the RNG stream does not depend on the capacity gate.
        let roll: f64 = self.rng.random();
        let x: f32 = self.rng.random_range(0.0..self.max_x);
        if roll >= self.probability {
            return SpawnDecision::SkipProbability;
        }
        if self
            .max_active
            .is_some_and(|max_active| active_obstacles >= max_active)
        {
            return SpawnDecision::SkipCapacity;
        }
        SpawnDecision::Spawn { x }
    }

    pub fn obstacle_at(&self, x: f32) -> Obstacle {
        Obstacle::new(
            Vec2 { x, y: self.spawn_y },
            Vec2 {
                x: 0.0,
                y: self.obstacle_speed,
            },
            self.obstacle_size,
        )
    }
}

/// Exclusive upper bound of the horizontal spawn offset. Validated configs
/// guarantee a positive range.
fn spawn_range_end(viewport: Viewport, obstacle_size: EntitySize) -> f32 {
    (viewport.width as f32 - obstacle_size.width).max(f32::MIN_POSITIVE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decisions(spawner: &mut Spawner, count: usize) -> Vec<SpawnDecision> {
        (0..count).map(|_| spawner.decide(0)).collect()
    }

    #[test]
    fn same_seed_reproduces_decisions() {
        let config = EngineConfig::default();
        let mut a = Spawner::new(&config, 7);
        let mut b = Spawner::new(&config, 7);

        assert_eq!(decisions(&mut a, 500), decisions(&mut b, 500));
    }

    #[test]
    fn spawn_offsets_stay_inside_playfield() {
        let config = EngineConfig {
            spawn_probability: 1.0,
            ..EngineConfig::default()
        };
        let mut spawner = Spawner::new(&config, 3);
        let limit = config.viewport.width as f32 - config.obstacle_size.width;

        for _ in 0..1000 {
            let SpawnDecision::Spawn { x } = spawner.decide(0) else {
                panic!("probability 1 must always spawn");
            };
            assert!((0.0..limit).contains(&x), "x={x}");
        }
    }

    #[test]
    fn zero_probability_never_spawns() {
        let config = EngineConfig {
            spawn_probability: 0.0,
            ..EngineConfig::default()
        };
        let mut spawner = Spawner::new(&config, 11);
        assert!(decisions(&mut spawner, 1000)
            .iter()
            .all(|decision| *decision == SpawnDecision::SkipProbability));
    }

    #[test]
    fn default_probability_spawns_about_two_percent() {
        let config = EngineConfig::default();
        let mut spawner = Spawner::new(&config, 1234);
        let spawned = decisions(&mut spawner, 20_000)
            .iter()
            .filter(|decision| matches!(decision, SpawnDecision::Spawn { .. }))
            .count();

        assert!((250..=550).contains(&spawned), "spawned={spawned}");
    }

    #[test]
    fn capacity_gate_skips_when_full() {
        let config = EngineConfig {
            spawn_probability: 1.0,
            max_active_obstacles: Some(2),
            ..EngineConfig::default()
        };
        let mut spawner = Spawner::new(&config, 5);

        assert!(matches!(spawner.decide(1), SpawnDecision::Spawn { .. }));
        assert_eq!(spawner.decide(2), SpawnDecision::SkipCapacity);
    }

    #[test]
    fn spawned_obstacle_starts_above_playfield_moving_down() {
        let config = EngineConfig::default();
        let spawner = Spawner::new(&config, 0);
        let obstacle = spawner.obstacle_at(25.0);

        assert_eq!(obstacle.position(), Vec2 { x: 25.0, y: -100.0 });
        assert!(obstacle.velocity().y > 0.0);
        assert!(obstacle.bounds().bottom() <= 0.0);
    }
}
