use std::mem;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, EngineConfig, Viewport};
use crate::sim::{GameEndSink, RunFlag, Session, Simulation, StepOutcome, TickInput};

use super::input::SteerInput;
use super::metrics::{LoopMetricsSnapshot, MetricsAccumulator, MetricsHandle};
use super::rendering::{render_session, RenderError, RenderOptions};
use super::surface::SharedSurface;
use super::timestep::{compute_cap_sleep, target_frame_duration, FixedTimestep};

pub const SIM_THREAD_NAME: &str = "dodge-sim";

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to spawn simulation thread: {0}")]
    SpawnThread(#[source] std::io::Error),
    #[error("simulation thread panicked")]
    SimulationPanicked,
    #[error("simulation is unavailable after an earlier thread failure")]
    Unavailable,
}

/// Host lifecycle notifications routed to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleEvent {
    SurfaceCreated { viewport: Viewport },
    SurfaceDestroyed,
    Press,
    Steer(i8),
}

enum ControllerState {
    Idle(Simulation),
    Running(JoinHandle<Simulation>),
    Failed,
}

/// Owns the simulation and the dedicated thread that drives it.
///
/// While a run is active the simulation lives on the thread; `stop` joins
/// the thread and takes it back. After `stop` returns no further ticks or
/// presents happen, so the surface can be torn down safely.
pub struct LoopController {
    surface: SharedSurface,
    steer: SteerInput,
    metrics: MetricsHandle,
    run_flag: RunFlag,
    slow_frame_delay: Duration,
    start_on_surface: bool,
    state: ControllerState,
}

impl LoopController {
    pub fn new(config: EngineConfig, sink: Box<dyn GameEndSink>) -> Result<Self, ControllerError> {
        let simulation = Simulation::new(config, sink)?;
        Ok(Self {
            surface: SharedSurface::new(),
            steer: SteerInput::default(),
            metrics: MetricsHandle::default(),
            run_flag: simulation.run_flag(),
            slow_frame_delay: Duration::ZERO,
            start_on_surface: true,
            state: ControllerState::Idle(simulation),
        })
    }

    /// Sleeps this long at the top of every loop iteration. Used to exercise
    /// catch-up behavior.
    pub fn with_slow_frame_delay(mut self, delay: Duration) -> Self {
        self.slow_frame_delay = delay;
        self
    }

    pub fn surface(&self) -> SharedSurface {
        self.surface.clone()
    }

    pub fn steer_input(&self) -> SteerInput {
        self.steer.clone()
    }

    pub fn metrics(&self) -> MetricsHandle {
        self.metrics.clone()
    }

    pub fn is_running(&self) -> bool {
        self.run_flag.is_set()
    }

    /// The session, when no thread currently owns it.
    pub fn idle_session(&self) -> Option<&Session> {
        match &self.state {
            ControllerState::Idle(simulation) => Some(simulation.session()),
            _ => None,
        }
    }

    /// Begins a fresh session on a new simulation thread. Does nothing when
    /// a session is already running.
    pub fn start(&mut self) -> Result<(), ControllerError> {
        if self.is_running() {
            debug!("start_ignored_already_running");
            return Ok(());
        }
        let mut simulation = self.reclaim()?;
        simulation.begin_session();
        self.launch(simulation)
    }

    /// Stops any active run, then starts a fresh session.
    pub fn restart(&mut self) -> Result<(), ControllerError> {
        self.stop()?;
        self.start()
    }

    /// Clears the run flag and blocks until the simulation thread has exited.
    /// A no-op when nothing is running.
    pub fn stop(&mut self) -> Result<(), ControllerError> {
        self.run_flag.clear();
        if matches!(self.state, ControllerState::Running(_)) {
            let simulation = self.reclaim()?;
            self.state = ControllerState::Idle(simulation);
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: LifecycleEvent) -> Result<(), ControllerError> {
        match event {
            LifecycleEvent::SurfaceCreated { viewport } => {
                if self.is_running() && self.surface.viewport() == Some(viewport) {
                    debug!("surface_already_live");
                    return Ok(());
                }
                let was_running = self.is_running();
                self.stop()?;
                if let ControllerState::Idle(simulation) = &mut self.state {
                    if simulation.session().viewport() != viewport {
                        simulation.set_viewport(viewport)?;
                    }
                }
                self.surface.create(viewport)?;
                info!(
                    width = viewport.width,
                    height = viewport.height,
                    "surface_created"
                );
                if was_running || mem::take(&mut self.start_on_surface) {
                    self.start()?;
                } else {
                    self.render_idle_frame();
                }
            }
            LifecycleEvent::SurfaceDestroyed => {
                self.start_on_surface = self.is_running();
                self.stop()?;
                self.surface.destroy();
                info!("surface_destroyed");
            }
            LifecycleEvent::Press => {
                if self.is_running() {
                    debug!("press_ignored_while_running");
                } else {
                    self.restart()?;
                }
            }
            LifecycleEvent::Steer(direction) => self.steer.set(direction),
        }
        Ok(())
    }

    fn reclaim(&mut self) -> Result<Simulation, ControllerError> {
        match mem::replace(&mut self.state, ControllerState::Failed) {
            ControllerState::Idle(simulation) => Ok(simulation),
            ControllerState::Running(handle) => match handle.join() {
                Ok(simulation) => Ok(simulation),
                Err(_) => {
                    self.run_flag.clear();
                    warn!("sim_thread_panicked");
                    Err(ControllerError::SimulationPanicked)
                }
            },
            ControllerState::Failed => Err(ControllerError::Unavailable),
        }
    }

    fn launch(&mut self, simulation: Simulation) -> Result<(), ControllerError> {
        self.metrics.publish_score(simulation.session().score());
        let context = LoopContext {
            run_flag: self.run_flag.clone(),
            surface: self.surface.clone(),
            steer: self.steer.clone(),
            metrics: self.metrics.clone(),
            render_options: render_options(simulation.config()),
            frame_target: target_frame_duration(simulation.config().max_render_fps),
            metrics_interval: simulation.config().metrics_log_interval,
            tick_rate_hz: simulation.config().tick_rate_hz,
            slow_frame_delay: self.slow_frame_delay,
        };
        let spawned = thread::Builder::new()
            .name(SIM_THREAD_NAME.to_owned())
            .spawn(move || run_loop(simulation, context));
        match spawned {
            Ok(handle) => {
                self.state = ControllerState::Running(handle);
                Ok(())
            }
            Err(source) => {
                self.run_flag.clear();
                Err(ControllerError::SpawnThread(source))
            }
        }
    }

    fn render_idle_frame(&self) {
        if let ControllerState::Idle(simulation) = &self.state {
            let options = render_options(simulation.config());
            if let FrameResult::Failed(error) =
                render_frame(&self.surface, simulation.session(), &options)
            {
                warn!(error = %error, "render_failed");
            }
        }
    }
}

impl Drop for LoopController {
    fn drop(&mut self) {
        if let Err(error) = self.stop() {
            warn!(error = %error, "stop_on_drop_failed");
        }
    }
}

struct LoopContext {
    run_flag: RunFlag,
    surface: SharedSurface,
    steer: SteerInput,
    metrics: MetricsHandle,
    render_options: RenderOptions,
    frame_target: Option<Duration>,
    metrics_interval: Duration,
    tick_rate_hz: u32,
    slow_frame_delay: Duration,
}

fn render_options(config: &EngineConfig) -> RenderOptions {
    RenderOptions {
        road_dash_length: config.road_markings.dash_length,
        road_dash_gap: config.road_markings.dash_gap,
        road_dash_width: config.road_markings.dash_width,
    }
}

fn run_loop(mut simulation: Simulation, context: LoopContext) -> Simulation {
    let session = simulation.session_id().0;
    let started = Instant::now();
    let mut timestep = FixedTimestep::new(context.tick_rate_hz);
    let mut metrics = MetricsAccumulator::new(context.metrics_interval, started);
    let mut last_time = started;
    let mut frame_started = started;
    let mut render_failure_logged = false;

    while context.run_flag.is_set() {
        if !context.slow_frame_delay.is_zero() {
            thread::sleep(context.slow_frame_delay);
        }

        let now = Instant::now();
        let elapsed = now.saturating_duration_since(last_time);
        last_time = now;

        let ticks_due = timestep.advance(elapsed);
        let ticks_run = run_due_ticks(&mut simulation, &context.steer, ticks_due);
        metrics.record_ticks(ticks_run);

        let session_state = simulation.session();
        context.metrics.publish_score(session_state.score());
        if !context.run_flag.is_set() && !session_state.has_ended() {
            break;
        }

        match render_frame(&context.surface, session_state, &context.render_options) {
            FrameResult::Presented => {
                let frame_now = Instant::now();
                metrics.record_frame(frame_now.saturating_duration_since(frame_started));
                frame_started = frame_now;
            }
            FrameResult::SurfaceInvalid => metrics.record_skipped_frame(),
            FrameResult::Failed(error) => {
                metrics.record_skipped_frame();
                if !render_failure_logged {
                    warn!(session, error = %error, "render_failed");
                    render_failure_logged = true;
                }
            }
        }

        let cap_sleep = compute_cap_sleep(
            Instant::now().saturating_duration_since(now),
            context.frame_target,
        );
        if !cap_sleep.is_zero() {
            thread::sleep(cap_sleep);
        }

        if let Some(snapshot) = metrics.maybe_snapshot(
            Instant::now(),
            session_state.obstacles().len(),
            session_state.score(),
        ) {
            context.metrics.publish(snapshot);
            info!(
                session,
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_ms = snapshot.frame_time_ms,
                skipped_frames = snapshot.skipped_frames,
                obstacles = snapshot.active_obstacles,
                score = snapshot.score,
                "loop_metrics"
            );
        }
    }

    let final_state = simulation.session();
    context.metrics.publish_score(final_state.score());
    context.metrics.publish(LoopMetricsSnapshot {
        active_obstacles: final_state.obstacles().len(),
        score: final_state.score(),
        ..context.metrics.snapshot()
    });
    info!(
        session,
        score = simulation.session().score(),
        ticks = simulation.session().ticks(),
        ended = simulation.session().has_ended(),
        "sim_thread_exited"
    );
    simulation
}

/// Runs up to `ticks_due` ticks, stopping early once the session ends.
fn run_due_ticks(simulation: &mut Simulation, steer: &SteerInput, ticks_due: u32) -> u32 {
    let mut ticks_run = 0;
    for _ in 0..ticks_due {
        let input = TickInput {
            steer: steer.sample(),
        };
        match simulation.step(&input) {
            StepOutcome::Survived { .. } => ticks_run += 1,
            StepOutcome::Collided { .. } => {
                ticks_run += 1;
                break;
            }
            StepOutcome::Halted => break,
        }
    }
    ticks_run
}

enum FrameResult {
    Presented,
    SurfaceInvalid,
    Failed(RenderError),
}

fn render_frame(surface: &SharedSurface, session: &Session, options: &RenderOptions) -> FrameResult {
    let Some(mut frame) = surface.lock() else {
        debug!("render_skipped_surface_invalid");
        return FrameResult::SurfaceInvalid;
    };
    let viewport = frame.viewport();
    match render_session(frame.frame_mut(), viewport, session, options) {
        Ok(()) => {
            frame.present();
            FrameResult::Presented
        }
        Err(error) => FrameResult::Failed(error),
    }
}
