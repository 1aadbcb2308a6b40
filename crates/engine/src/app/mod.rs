mod event_system;
mod events;
mod frame_pacer;
mod input;
mod joystick;
mod loop_runner;
mod metrics;
mod winit_source;

pub use event_system::EventSystem;
pub use events::{hat, DeviceIndex, DeviceInfo, EventSource, PlatformEvent, QueuedEventSource};
pub use frame_pacer::{
    desired_frame_delta, Clock, FpsWindow, FramePacer, PacerError, SystemClock,
    DEFAULT_FPS_WINDOW,
};
pub use input::{InputRegistry, ToggleState};
pub use joystick::{Joystick, JoystickArena, MAX_JOYSTICKS};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopCommand, LoopConfig, Simulation};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use winit_source::WinitTranslator;
pub use winit::keyboard::KeyCode;
