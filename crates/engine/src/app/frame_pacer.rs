use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

pub const DEFAULT_FPS_WINDOW: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum PacerError {
    #[error("desired frame rate must be a positive finite number, got {0}")]
    InvalidFrameRate(f64),
}

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Fixed-capacity FPS history; the oldest sample is evicted first.
#[derive(Debug, Clone)]
pub struct FpsWindow {
    samples: Vec<f32>,
    head: usize,
    count: usize,
}

impl FpsWindow {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity.max(1)],
            head: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn push(&mut self, fps: f32) {
        let capacity = self.samples.len();
        if self.count < capacity {
            self.count += 1;
        }
        self.samples[self.head] = fps;
        self.head = (self.head + 1) % capacity;
    }

    /// Mean of the retained samples, 0 when empty.
    pub fn average(&self) -> f32 {
        if self.count == 0 {
            return 0.0;
        }
        // Live samples always occupy the first `count` slots.
        self.samples[..self.count].iter().sum::<f32>() / self.count as f32
    }
}

/// Coarse frame limiter.
///
/// Each frame sleeps for `desired - previous_delta`, so it converges on the
/// target rate instead of locking to it.
#[derive(Debug)]
pub struct FramePacer<C: Clock = SystemClock> {
    clock: C,
    last_tick: Option<Instant>,
    frame_delta: Duration,
    desired_delta: Duration,
    fps: FpsWindow,
}

impl FramePacer<SystemClock> {
    pub fn new(desired_fps: f64, fps_window: usize) -> Result<Self, PacerError> {
        Self::with_clock(SystemClock, desired_fps, fps_window)
    }
}

impl<C: Clock> FramePacer<C> {
    pub fn with_clock(clock: C, desired_fps: f64, fps_window: usize) -> Result<Self, PacerError> {
        let desired_delta = desired_frame_delta(desired_fps)?;
        Ok(Self {
            clock,
            last_tick: None,
            frame_delta: desired_delta,
            desired_delta,
            fps: FpsWindow::new(fps_window),
        })
    }

    pub fn begin_frame(&mut self) {
        let Some(last_tick) = self.last_tick else {
            self.last_tick = Some(self.clock.now());
            return;
        };

        let delay = compute_frame_delay(self.frame_delta, self.desired_delta);
        if delay > Duration::ZERO {
            self.clock.sleep(delay);
        }

        let now = self.clock.now();
        self.frame_delta = now.saturating_duration_since(last_tick);
        self.last_tick = Some(now);

        if self.frame_delta.is_zero() {
            debug!("zero_frame_delta_skipped");
            return;
        }
        self.fps.push(1.0 / self.frame_delta.as_secs_f32());
    }

    pub fn fps(&self) -> f32 {
        self.fps.average()
    }

    pub fn fps_window(&self) -> &FpsWindow {
        &self.fps
    }

    pub fn frame_delta(&self) -> Duration {
        self.frame_delta
    }

    pub fn desired_delta(&self) -> Duration {
        self.desired_delta
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Frame period for `desired_fps`. Rates so low that the period does not fit
/// in a `Duration` are rejected along with non-positive ones.
pub fn desired_frame_delta(desired_fps: f64) -> Result<Duration, PacerError> {
    if !desired_fps.is_finite() || desired_fps <= 0.0 {
        return Err(PacerError::InvalidFrameRate(desired_fps));
    }
    Duration::try_from_secs_f64(1.0 / desired_fps)
        .map_err(|_| PacerError::InvalidFrameRate(desired_fps))
}

fn compute_frame_delay(last_delta: Duration, desired_delta: Duration) -> Duration {
    desired_delta.saturating_sub(last_delta)
}
