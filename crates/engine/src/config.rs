use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TICK_RATE_HZ: u32 = 60;
pub const DEFAULT_SPAWN_PROBABILITY: f64 = 0.02;
pub const MAX_ROAD_LANES: u32 = 16;
/// Shortest dash drawn, in pixels. Bounds the dashes per divider to the
/// viewport height.
pub const MIN_DASH_LENGTH: f32 = 1.0;

/// Playfield size in surface pixels, fixed for the lifetime of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 480,
            height: 800,
        }
    }
}

impl Viewport {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidViewport {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }

    pub(crate) fn frame_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntitySize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadMarkingConfig {
    pub lanes: u32,
    pub dash_length: f32,
    pub dash_gap: f32,
    pub dash_width: f32,
}

impl Default for RoadMarkingConfig {
    fn default() -> Self {
        Self {
            lanes: 3,
            dash_length: 40.0,
            dash_gap: 30.0,
            dash_width: 6.0,
        }
    }
}

/// Tunables for one engine instance. Every field has the reference default,
/// so a partial JSON document deserializes into a complete config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub viewport: Viewport,
    pub tick_rate_hz: u32,
    pub spawn_probability: f64,
    pub max_active_obstacles: Option<usize>,
    pub rng_seed: Option<u64>,
    pub vehicle_size: EntitySize,
    /// Vehicle spawn point as fractions of the viewport. The vehicle is
    /// centered horizontally on the x fraction; y is its top edge.
    pub vehicle_spawn_fraction: (f32, f32),
    pub steer_speed_px_per_sec: f32,
    pub obstacle_size: EntitySize,
    pub obstacle_spawn_y: f32,
    pub obstacle_speed_px_per_sec: f32,
    pub road_markings: RoadMarkingConfig,
    pub max_render_fps: Option<u32>,
    #[serde(with = "millis")]
    pub metrics_log_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            spawn_probability: DEFAULT_SPAWN_PROBABILITY,
            max_active_obstacles: None,
            rng_seed: None,
            vehicle_size: EntitySize {
                width: 60.0,
                height: 100.0,
            },
            vehicle_spawn_fraction: (0.5, 0.8),
            steer_speed_px_per_sec: 0.0,
            obstacle_size: EntitySize {
                width: 100.0,
                height: 100.0,
            },
            obstacle_spawn_y: -100.0,
            obstacle_speed_px_per_sec: 300.0,
            road_markings: RoadMarkingConfig::default(),
            max_render_fps: Some(120),
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

impl RoadMarkingConfig {
    pub fn validate(&self, viewport: Viewport) -> Result<(), ConfigError> {
        if self.lanes == 0 || self.lanes > MAX_ROAD_LANES.min(viewport.width) {
            return Err(ConfigError::RoadLanesOutOfRange {
                lanes: self.lanes,
                max: MAX_ROAD_LANES.min(viewport.width),
            });
        }
        if !self.dash_length.is_finite() || self.dash_length < MIN_DASH_LENGTH {
            return Err(ConfigError::InvalidRoadMarking {
                field: "dash_length",
                value: self.dash_length,
            });
        }
        if !self.dash_gap.is_finite() || self.dash_gap < 0.0 {
            return Err(ConfigError::InvalidRoadMarking {
                field: "dash_gap",
                value: self.dash_gap,
            });
        }
        if !self.dash_width.is_finite()
            || self.dash_width <= 0.0
            || self.dash_width > viewport.width as f32
        {
            return Err(ConfigError::InvalidRoadMarking {
                field: "dash_width",
                value: self.dash_width,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("viewport must be non-empty, got {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
    #[error("tick rate must be at least 1 Hz")]
    ZeroTickRate,
    #[error("spawn probability must be within [0, 1], got {0}")]
    SpawnProbabilityOutOfRange(f64),
    #[error("{entity} size must be positive, got {width}x{height}")]
    InvalidEntitySize {
        entity: &'static str,
        width: f32,
        height: f32,
    },
    #[error("obstacle width {obstacle_width} does not fit in a {viewport_width}px wide playfield")]
    ObstacleWiderThanPlayfield {
        obstacle_width: f32,
        viewport_width: u32,
    },
    #[error("{field} must be a finite non-negative number, got {value}")]
    InvalidSpeed { field: &'static str, value: f32 },
    #[error("spawn point fractions must be within [0, 1], got ({x}, {y})")]
    SpawnFractionOutOfRange { x: f32, y: f32 },
    #[error("road lanes must be within 1..={max}, got {lanes}")]
    RoadLanesOutOfRange { lanes: u32, max: u32 },
    #[error("road marking {field} is out of range, got {value}")]
    InvalidRoadMarking { field: &'static str, value: f32 },
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.viewport.validate()?;
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(ConfigError::SpawnProbabilityOutOfRange(
                self.spawn_probability,
            ));
        }
        validate_size("vehicle", self.vehicle_size)?;
        validate_size("obstacle", self.obstacle_size)?;
        if self.obstacle_size.width >= self.viewport.width as f32 {
            return Err(ConfigError::ObstacleWiderThanPlayfield {
                obstacle_width: self.obstacle_size.width,
                viewport_width: self.viewport.width,
            });
        }
        validate_speed("steer_speed_px_per_sec", self.steer_speed_px_per_sec)?;
        validate_speed("obstacle_speed_px_per_sec", self.obstacle_speed_px_per_sec)?;
        let (x, y) = self.vehicle_spawn_fraction;
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            return Err(ConfigError::SpawnFractionOutOfRange { x, y });
        }
        self.road_markings.validate(self.viewport)
    }

    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate_hz.max(1) as f32
    }
}

fn validate_size(entity: &'static str, size: EntitySize) -> Result<(), ConfigError> {
    if size.width > 0.0 && size.height > 0.0 && size.width.is_finite() && size.height.is_finite()
    {
        return Ok(());
    }
    Err(ConfigError::InvalidEntitySize {
        entity,
        width: size.width,
        height: size.height,
    })
}

fn validate_speed(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidSpeed { field, value })
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
