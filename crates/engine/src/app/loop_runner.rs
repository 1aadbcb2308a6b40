use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::autopilot::AutopilotError;
use crate::config::{ConfigError, EngineConfig};
use crate::StartupError;

use super::event_system::EventSystem;
use super::events::{EventSource, QueuedEventSource};
use super::frame_pacer::{FramePacer, PacerError};
use super::metrics::{LoopMetricsSnapshot, MetricsHandle, TickCounter};
use super::winit_source::WinitTranslator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    Continue,
    Quit,
}

/// Game-side hooks driven by the loop runner.
pub trait Simulation {
    fn load(&mut self) {}

    /// Called once per rendered frame, after the event pump has run.
    fn handle_input(&mut self, events: &EventSystem) -> LoopCommand;

    /// Called zero or more times per frame with a fixed step.
    fn update(&mut self, fixed_dt_seconds: f64) -> LoopCommand;

    fn autopilot_engaged(&self) -> bool {
        false
    }

    /// Short status shown in the window title when metrics are published.
    fn status_line(&self) -> Option<String> {
        None
    }

    fn shutdown(&mut self) {}
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub desired_fps: f64,
    pub fps_window: usize,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for LoopConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            window_title: config.window_title.clone(),
            window_width: config.window_width,
            window_height: config.window_height,
            desired_fps: config.desired_fps,
            fps_window: config.fps_window,
            target_tps: config.target_tps,
            max_frame_delta: Duration::from_millis(config.max_frame_delta_ms),
            max_ticks_per_frame: config.max_ticks_per_frame,
            metrics_log_interval: Duration::from_millis(config.metrics_log_interval_ms),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pacer(#[from] PacerError),
    #[error("failed to set up autopilot: {0}")]
    Autopilot(#[from] AutopilotError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, simulation: Box<dyn Simulation>) -> Result<(), AppError> {
    run_app_with_metrics(config, simulation, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut simulation: Box<dyn Simulation>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let mut pacer = FramePacer::new(config.desired_fps, config.fps_window)?;
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = WindowBuilder::new()
        .with_title(config.window_title.clone())
        .with_inner_size(LogicalSize::new(
            config.window_width as f64,
            config.window_height as f64,
        ))
        .build(&event_loop)
        .map_err(AppError::CreateWindow)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut translator = WinitTranslator::new();
    let mut pending = QueuedEventSource::new();
    let mut stepper = FrameStepper::new(&config, Instant::now());
    stepper.events.init(&pending);
    simulation.load();

    info!(
        desired_fps = config.desired_fps,
        target_tps = stepper.target_tps,
        max_frame_delta_ms = stepper.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = stepper.max_ticks_per_frame,
        "loop_config"
    );

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::RedrawRequested => {
                    pacer.begin_frame();
                    let outcome =
                        stepper.run_frame(&mut pending, pacer.frame_delta(), simulation.as_mut());

                    if let Some(tps) = stepper.tick_counter.maybe_rate(Instant::now()) {
                        let snapshot = LoopMetricsSnapshot {
                            fps: pacer.fps(),
                            tps,
                            frame_time_ms: pacer.frame_delta().as_secs_f32() * 1000.0,
                            autopilot_engaged: simulation.autopilot_engaged(),
                        };
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            autopilot_engaged = snapshot.autopilot_engaged,
                            "loop_metrics"
                        );
                        if let Some(status) = simulation.status_line() {
                            window.set_title(&format!("{} | {status}", config.window_title));
                        }
                    }

                    if outcome.quit {
                        info!("shutdown_requested");
                        window_target.exit();
                    }
                }
                other => {
                    if let Some(platform_event) = translator.translate(&other) {
                        pending.push(platform_event);
                    }
                }
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                simulation.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameOutcome {
    pub(crate) ticks_run: u32,
    pub(crate) quit: bool,
}

/// One frame of input handling plus fixed-step simulation, independent of the
/// window so it can be driven from tests.
#[derive(Debug)]
pub(crate) struct FrameStepper {
    pub(crate) events: EventSystem,
    accumulator: Duration,
    fixed_dt: Duration,
    target_tps: u32,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    pub(crate) tick_counter: TickCounter,
}

impl FrameStepper {
    pub(crate) fn new(config: &LoopConfig, now: Instant) -> Self {
        let target_tps = config.target_tps.max(1);
        let metrics_log_interval =
            normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
        Self {
            events: EventSystem::new(),
            accumulator: Duration::ZERO,
            fixed_dt: Duration::from_secs_f64(1.0 / target_tps as f64),
            target_tps,
            max_frame_delta: normalize_non_zero_duration(
                config.max_frame_delta,
                Duration::from_millis(250),
            ),
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            tick_counter: TickCounter::new(metrics_log_interval, now),
        }
    }

    pub(crate) fn run_frame(
        &mut self,
        source: &mut impl EventSource,
        frame_dt: Duration,
        simulation: &mut dyn Simulation,
    ) -> FrameOutcome {
        self.events.process_events(source);
        if self.events.quit_requested() {
            return FrameOutcome {
                ticks_run: 0,
                quit: true,
            };
        }
        if simulation.handle_input(&self.events) == LoopCommand::Quit {
            self.events.request_quit();
            return FrameOutcome {
                ticks_run: 0,
                quit: true,
            };
        }

        self.accumulator = self
            .accumulator
            .saturating_add(clamp_frame_delta(frame_dt, self.max_frame_delta));
        let step_plan = plan_sim_steps(self.accumulator, self.fixed_dt, self.max_ticks_per_frame);
        self.accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame = self.max_ticks_per_frame,
                "sim_clamp_triggered"
            );
        }

        let fixed_dt_seconds = self.fixed_dt.as_secs_f64();
        let mut ticks_run = 0;
        for _ in 0..step_plan.ticks_to_run {
            let command = simulation.update(fixed_dt_seconds);
            self.tick_counter.record_tick();
            ticks_run += 1;
            if command == LoopCommand::Quit {
                self.events.request_quit();
                return FrameOutcome {
                    ticks_run,
                    quit: true,
                };
            }
        }

        FrameOutcome {
            ticks_run,
            quit: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };

    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
