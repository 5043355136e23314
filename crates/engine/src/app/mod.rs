mod controller;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod surface;
mod timestep;

pub use controller::{ControllerError, LifecycleEvent, LoopController, SIM_THREAD_NAME};
pub use input::{InputAction, SteerInput};
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{render_session, RenderError, RenderOptions};
pub use surface::{FrameLock, SharedSurface};
pub use timestep::FixedTimestep;
