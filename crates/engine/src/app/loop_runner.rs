use std::env;
use std::sync::Arc;
use std::time::Duration;

use pixels::{Error as PixelsError, Pixels, SurfaceTexture};
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::config::EngineConfig;
use crate::sim::GameEndSink;

use super::controller::{ControllerError, LifecycleEvent, LoopController};
use super::input::{ActionStates, InputAction};
use super::timestep::target_frame_duration;

pub const SLOW_FRAME_ENV_VAR: &str = "DODGE_SLOW_FRAME_MS";

const IDLE_WAKE_INTERVAL: Duration = Duration::from_millis(8);

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    /// Initial window size as a multiple of the playfield size.
    pub window_scale: f64,
    pub engine: EngineConfig,
    pub simulated_slow_frame_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Dodge".to_string(),
            window_scale: 1.0,
            engine: EngineConfig::default(),
            simulated_slow_frame_ms: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to present frame: {0}")]
    Present(#[source] PixelsError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens a window and runs the game until the window is closed or Escape is
/// pressed. `sink` receives every game-over notification.
pub fn run_app(config: LoopConfig, sink: Box<dyn GameEndSink>) -> Result<(), AppError> {
    let viewport = config.engine.viewport;
    let frame_interval =
        target_frame_duration(config.engine.max_render_fps).unwrap_or(IDLE_WAKE_INTERVAL);
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);

    let mut controller =
        LoopController::new(config.engine.clone(), sink)?.with_slow_frame_delay(slow_frame_delay);
    let surface = controller.surface();
    let metrics = controller.metrics();

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let scale = if config.window_scale.is_finite() && config.window_scale > 0.0 {
        config.window_scale
    } else {
        1.0
    };
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                viewport.width as f64 * scale,
                viewport.height as f64 * scale,
            ))
            .with_min_inner_size(LogicalSize::new(
                viewport.width as f64 * 0.25,
                viewport.height as f64 * 0.25,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let window_size = window.inner_size();
    let mut pixels = Pixels::new(
        viewport.width,
        viewport.height,
        SurfaceTexture::new(window_size.width, window_size.height, Arc::clone(&window)),
    )
    .map_err(AppError::CreateRenderer)?;

    info!(
        width = viewport.width,
        height = viewport.height,
        tick_rate_hz = config.engine.tick_rate_hz,
        spawn_probability = config.engine.spawn_probability,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = ?config.engine.max_render_fps,
        "loop_config"
    );

    let mut input = InputCollector::default();
    let mut last_copied_frame: Option<u64> = None;
    let mut last_applied_title: Option<String> = None;
    let mut failure: Option<AppError> = None;

    event_loop.set_control_flow(ControlFlow::wait_duration(frame_interval));
    let run_result = event_loop.run(|event, window_target| {
        let mut lifecycle: Option<LifecycleEvent> = None;
        match event {
            Event::Resumed => {
                lifecycle = Some(LifecycleEvent::SurfaceCreated { viewport });
            }
            Event::Suspended => {
                lifecycle = Some(LifecycleEvent::SurfaceDestroyed);
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    lifecycle = Some(LifecycleEvent::SurfaceDestroyed);
                    window_target.exit();
                }
                WindowEvent::Resized(size) => {
                    if size.width > 0 && size.height > 0 {
                        if let Err(error) = pixels.resize_surface(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let steer_before = input.steer_direction();
                    input.handle_key(event.physical_key, event.state);
                    if input.quit_requested() {
                        info!(reason = "escape_key", "shutdown_requested");
                        lifecycle = Some(LifecycleEvent::SurfaceDestroyed);
                        window_target.exit();
                    } else if input.take_press() {
                        lifecycle = Some(LifecycleEvent::Press);
                    } else if input.steer_direction() != steer_before {
                        lifecycle = Some(LifecycleEvent::Steer(input.steer_direction()));
                    }
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input.handle_mouse_input(button, state);
                    if input.take_press() {
                        lifecycle = Some(LifecycleEvent::Press);
                    }
                }
                WindowEvent::Focused(false) => {
                    input.release_all();
                    lifecycle = Some(LifecycleEvent::Steer(0));
                }
                WindowEvent::RedrawRequested => {
                    if let Some(frame_id) = surface.copy_front_into(pixels.frame_mut()) {
                        last_copied_frame = Some(frame_id);
                    }
                    if let Err(error) = pixels.render() {
                        warn!(error = %error, "present_failed");
                        failure.get_or_insert(AppError::Present(error));
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                if last_copied_frame != Some(surface.presented_frames()) {
                    window.request_redraw();
                }
                let next_title = window_title(
                    &config.window_title,
                    controller.is_running(),
                    metrics.live_score(),
                );
                if last_applied_title.as_deref() != Some(next_title.as_str()) {
                    window.set_title(&next_title);
                    last_applied_title = Some(next_title);
                }
                window_target.set_control_flow(ControlFlow::wait_duration(frame_interval));
            }
            Event::LoopExiting => {
                if let Err(error) = controller.stop() {
                    warn!(error = %error, "stop_on_exit_failed");
                }
                info!("shutdown");
            }
            _ => {}
        }

        if let Some(lifecycle) = lifecycle {
            if let Err(error) = controller.handle_event(lifecycle) {
                warn!(error = %error, event = ?lifecycle, "lifecycle_event_failed");
                failure.get_or_insert(AppError::Controller(error));
                window_target.exit();
            }
        }
    });

    run_result.map_err(AppError::EventLoopRun)?;
    match failure {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Keyboard and mouse state between events. Press gestures are edge
/// triggered on the `Press` action: holding any press key or button yields
/// one press until all of them are released.
#[derive(Debug, Default)]
struct InputCollector {
    action_states: ActionStates,
    press_pressed_edge: bool,
    press_keys_down: u8,
    left_mouse_is_down: bool,
}

impl InputCollector {
    fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        let is_pressed = state == ElementState::Pressed;
        match key {
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::SteerLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::SteerRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Space) => self.handle_press_key(0b01, is_pressed),
            PhysicalKey::Code(KeyCode::Enter) => self.handle_press_key(0b10, is_pressed),
            PhysicalKey::Code(KeyCode::Escape) => {
                self.action_states.set(InputAction::Quit, is_pressed);
            }
            _ => {}
        }
    }

    fn handle_press_key(&mut self, bit: u8, is_pressed: bool) {
        if is_pressed {
            self.press_keys_down |= bit;
        } else {
            self.press_keys_down &= !bit;
        }
        self.sync_press_action();
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        if button != MouseButton::Left {
            return;
        }
        self.left_mouse_is_down = state == ElementState::Pressed;
        self.sync_press_action();
    }

    fn sync_press_action(&mut self) {
        let held = self.press_keys_down != 0 || self.left_mouse_is_down;
        if held && !self.action_states.is_down(InputAction::Press) {
            self.press_pressed_edge = true;
        }
        self.action_states.set(InputAction::Press, held);
    }

    fn quit_requested(&self) -> bool {
        self.action_states.is_down(InputAction::Quit)
    }

    fn take_press(&mut self) -> bool {
        std::mem::take(&mut self.press_pressed_edge)
    }

    fn steer_direction(&self) -> i8 {
        self.action_states.steer_direction()
    }

    /// Focus loss drops key-up events, so held keys are forgotten.
    fn release_all(&mut self) {
        *self = Self::default();
    }
}

fn window_title(base: &str, running: bool, score: u64) -> String {
    if running {
        format!("{base} | score {score}")
    } else {
        format!("{base} | game over, score {score} | click or press Space to play again")
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
