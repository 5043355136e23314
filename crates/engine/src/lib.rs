pub mod app;
pub mod config;
pub mod sim;

pub use app::{
    render_session, run_app, AppError, ControllerError, FixedTimestep, FrameLock, InputAction,
    LifecycleEvent, LoopConfig, LoopController, LoopMetricsSnapshot, MetricsHandle, RenderError,
    RenderOptions, SharedSurface, SteerInput, SIM_THREAD_NAME, SLOW_FRAME_ENV_VAR,
};
pub use config::{ConfigError, EngineConfig, EntitySize, RoadMarkingConfig, Viewport};
pub use sim::{
    first_collision, overlaps, Aabb, ChannelGameEndSink, GameEndSink, GameEnded, Obstacle,
    RoadMarking, RunFlag, Session, SessionId, Simulation, SpawnDecision, Spawner, StepOutcome,
    TickInput, Vec2, Vehicle,
};
