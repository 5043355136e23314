//! Deterministic gameplay: world state, spawning, collision and the
//! fixed-tick step that ties them together.

mod collision;
mod notifier;
mod spawner;
mod step;
mod world;

pub use collision::{first_collision, overlaps};
pub use notifier::{ChannelGameEndSink, GameEndSink, GameEnded, SessionId};
pub use spawner::{SpawnDecision, Spawner};
pub use step::{Simulation, StepOutcome, TickInput};
pub use world::{Aabb, Obstacle, RoadMarking, RunFlag, Session, Vec2, Vehicle};
