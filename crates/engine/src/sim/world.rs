use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{EngineConfig, EntitySize, Viewport};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned box, `x`/`y` at the top-left corner in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_position(position: Vec2, size: EntitySize) -> Self {
        Self::new(position.x, position.y, size.width, size.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub position: Vec2,
    pub size: EntitySize,
}

impl Vehicle {
    pub(crate) fn spawn(config: &EngineConfig) -> Self {
        let (fraction_x, fraction_y) = config.vehicle_spawn_fraction;
        let viewport = config.viewport;
        Self {
            position: Vec2 {
                x: viewport.width as f32 * fraction_x - config.vehicle_size.width * 0.5,
                y: viewport.height as f32 * fraction_y,
            },
            size: config.vehicle_size,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_position(self.position, self.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    position: Vec2,
    /// Pixels per second.
    velocity: Vec2,
    size: EntitySize,
    bounds: Aabb,
}

impl Obstacle {
    pub fn new(position: Vec2, velocity: Vec2, size: EntitySize) -> Self {
        Self {
            position,
            velocity,
            size,
            bounds: Aabb::from_position(position, size),
        }
    }

    /// Moves by one tick and refreshes the box in the same call, so the box
    /// handed to collision tests always reflects the current position.
    pub(crate) fn advance(&mut self, dt_seconds: f32) {
        self.position.x += self.velocity.x * dt_seconds;
        self.position.y += self.velocity.y * dt_seconds;
        self.bounds = Aabb::from_position(self.position, self.size);
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub(crate) fn is_past_trailing_edge(&self, viewport: Viewport) -> bool {
        self.bounds.y > viewport.height as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadMarking {
    /// Horizontal center of the dashed divider.
    pub x: f32,
    /// Scroll position of the dash pattern, in `[0, dash_length + dash_gap)`.
    pub offset: f32,
}

/// Session run flag. Cloned handles observe the same flag; the simulation
/// thread reads it every iteration and `stop()` clears it from outside.
#[derive(Debug, Clone, Default)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Mutable gameplay state for one run.
#[derive(Debug)]
pub struct Session {
    pub(crate) viewport: Viewport,
    pub(crate) vehicle: Vehicle,
    pub(crate) obstacles: Vec<Obstacle>,
    pub(crate) road_markings: Vec<RoadMarking>,
    pub(crate) score: u64,
    pub(crate) ticks: u64,
    pub(crate) run_flag: RunFlag,
    pub(crate) end_notified: bool,
}

impl Session {
    pub(crate) fn new(config: &EngineConfig, run_flag: RunFlag) -> Self {
        Self {
            viewport: config.viewport,
            vehicle: Vehicle::spawn(config),
            obstacles: Vec::new(),
            road_markings: initial_road_markings(config),
            score: 0,
            ticks: 0,
            run_flag,
            end_notified: false,
        }
    }

    /// Resets in place to the start-of-run state. The run flag is left to
    /// the caller so a reset session can be inspected before it is started.
    pub(crate) fn reset(&mut self, config: &EngineConfig) {
        self.viewport = config.viewport;
        self.vehicle = Vehicle::spawn(config);
        self.obstacles.clear();
        self.road_markings = initial_road_markings(config);
        self.score = 0;
        self.ticks = 0;
        self.end_notified = false;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn road_markings(&self) -> &[RoadMarking] {
        &self.road_markings
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Ticks processed since the last reset, including a colliding tick.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.run_flag.is_set()
    }

    /// True once the run ended by collision (as opposed to an external stop).
    pub fn has_ended(&self) -> bool {
        self.end_notified
    }
}

fn initial_road_markings(config: &EngineConfig) -> Vec<RoadMarking> {
    let lanes = config.road_markings.lanes.max(1);
    let lane_width = config.viewport.width as f32 / lanes as f32;
    (1..lanes)
        .map(|divider| RoadMarking {
            x: lane_width * divider as f32,
            offset: 0.0,
        })
        .collect()
}
