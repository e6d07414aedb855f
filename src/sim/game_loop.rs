//! Fixed-timestep frame driver
//!
//! Each frame adds wall-clock time to an accumulator and drains it in whole
//! `step`s through `fixed_update`, then runs one variable `update` and one
//! `render` with the leftover fraction as the interpolation factor.

use crate::consts::STEP;

/// Receiver of the three per-frame phases
pub trait FrameHandler {
    /// Physics and collision, called with a constant `dt`
    fn fixed_update(&mut self, dt: f32);
    /// Variable-rate logic (AI decisions, timers, input)
    fn update(&mut self, dt: f32);
    /// Draw. Must not change simulation state.
    fn render(&mut self, alpha: f32);
}

/// Frames per second measured over a sliding window
#[derive(Debug, Clone)]
struct FpsCounter {
    window: f64,
    elapsed: f64,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new(window: f64) -> Self {
        Self {
            window,
            elapsed: 0.0,
            frames: 0,
            fps: 0.0,
        }
    }

    fn record(&mut self, elapsed: f64) {
        self.elapsed += elapsed;
        self.frames += 1;
        if self.elapsed >= self.window {
            self.fps = (self.frames as f64 / self.elapsed).round() as f32;
            self.elapsed = 0.0;
            self.frames = 0;
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameLoop {
    step: f64,
    previous: Option<f64>,
    accumulator: f64,
    frame_count: u64,
    running: bool,
    fps: FpsCounter,
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new(STEP as f64, 0.5)
    }
}

impl GameLoop {
    /// `step` and `fps_window` in seconds
    pub fn new(step: f64, fps_window: f64) -> Self {
        Self {
            step,
            previous: None,
            accumulator: 0.0,
            frame_count: 0,
            running: true,
            fps: FpsCounter::new(fps_window),
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn fps(&self) -> f32 {
        self.fps.fps
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop consuming frames. The next frame after `start` only re-anchors the clock.
    pub fn stop(&mut self) {
        self.running = false;
        self.previous = None;
    }

    /// Run one frame at monotonic time `now` (seconds).
    ///
    /// The first frame only records the timestamp. Returns how many fixed
    /// steps ran.
    pub fn frame<H: FrameHandler + ?Sized>(&mut self, now: f64, handler: &mut H) -> u32 {
        if !self.running {
            return 0;
        }
        let Some(previous) = self.previous.replace(now) else {
            return 0;
        };

        let elapsed = (now - previous).max(0.0);
        self.accumulator += elapsed;

        let steps = (self.accumulator / self.step).floor();
        self.accumulator = (self.accumulator - steps * self.step).max(0.0);
        let steps = steps as u32;
        for _ in 0..steps {
            handler.fixed_update(self.step as f32);
        }

        handler.update(elapsed as f32);
        handler.render((self.accumulator / self.step) as f32);

        self.frame_count += 1;
        self.fps.record(elapsed);
        steps
    }
}
