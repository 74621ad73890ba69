//! Self-rescheduling frame loop.
//!
//! Every redraw runs one frame: the next redraw is requested first, then the
//! frame body updates and draws the scene. A body that fails is logged and
//! the loop keeps going, because the next frame is already queued.
//!
//! The clock reports time 0 on the first frame and the elapsed time since
//! then, in clock units (milliseconds by default), afterwards. The delta to
//! the previous frame is clamped to [`MAX_FRAME_TIME`] for per-second
//! spinning; the elapsed time itself is never clamped.

use std::fmt;
use std::time::Instant;

use terra_render::SurfaceError;
use terra_scene::{FrameInput, SceneError};
use tracing::{debug, error, warn};

/// Longest inter-frame delta, in seconds, fed to the spin update.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Delta reported for the very first frame, one tick at 60 Hz.
const FIRST_FRAME_DELTA: f64 = 1.0 / 60.0;

/// Whether the loop is waiting for its next redraw or inside a frame body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Scheduled,
    Running,
}

/// Why a frame body failed.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("scene update failed: {0}")]
    Scene(#[from] SceneError),

    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),
}

impl FrameError {
    /// Errors after which no further frame can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Surface(SurfaceError::OutOfMemory))
    }
}

/// Converts wall-clock instants into [`FrameInput`]s.
#[derive(Clone, Debug)]
pub struct FrameClock {
    units_per_second: f64,
    first: Option<Instant>,
    previous: Option<Instant>,
}

impl FrameClock {
    pub fn new(units_per_second: f64) -> Self {
        Self {
            units_per_second,
            first: None,
            previous: None,
        }
    }

    /// Timing for a frame starting at `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameInput {
        let first = *self.first.get_or_insert(now);
        let time = now.duration_since(first).as_secs_f64() * self.units_per_second;

        let delta_seconds = match self.previous.replace(now) {
            None => FIRST_FRAME_DELTA,
            Some(previous) => clamp_frame_time(now.duration_since(previous).as_secs_f64()),
        };

        FrameInput {
            time,
            delta_seconds,
        }
    }
}

fn clamp_frame_time(frame_time: f64) -> f64 {
    if frame_time > MAX_FRAME_TIME {
        warn!(
            "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
            frame_time * 1000.0,
            MAX_FRAME_TIME * 1000.0
        );
        MAX_FRAME_TIME
    } else {
        frame_time
    }
}

/// Frame counters, logged every `interval` frames.
#[derive(Clone, Debug, Default)]
struct FrameStats {
    interval: u64,
    window_start: Option<Instant>,
    window_frames: u64,
}

impl FrameStats {
    fn record(&mut self, now: Instant, total_frames: u64, failed_frames: u64) {
        if self.interval == 0 {
            return;
        }
        let start = *self.window_start.get_or_insert(now);
        self.window_frames += 1;
        if self.window_frames < self.interval {
            return;
        }
        let elapsed = now.duration_since(start).as_secs_f64();
        let fps = if elapsed > 0.0 {
            self.window_frames as f64 / elapsed
        } else {
            0.0
        };
        debug!("Frame {total_frames}: {fps:.1} fps, {failed_frames} failed frames so far");
        self.window_start = Some(now);
        self.window_frames = 0;
    }
}

/// The animation driver's scheduling shell.
pub struct FrameLoop {
    clock: FrameClock,
    state: DriverState,
    frame_count: u64,
    failed_frames: u64,
    stats: FrameStats,
}

impl FrameLoop {
    /// `stats_interval` of 0 disables the periodic statistics line.
    pub fn new(units_per_second: f64, stats_interval: u64) -> Self {
        Self {
            clock: FrameClock::new(units_per_second),
            state: DriverState::Scheduled,
            frame_count: 0,
            failed_frames: 0,
            stats: FrameStats {
                interval: stats_interval,
                ..FrameStats::default()
            },
        }
    }

    /// Run one frame: call `re_arm` to queue the next one, then `body` with
    /// this frame's timing. A failing body is logged; the error is returned
    /// so the caller can stop on fatal errors.
    pub fn run_frame(
        &mut self,
        re_arm: impl FnOnce(),
        body: impl FnOnce(FrameInput) -> Result<(), FrameError>,
    ) -> Result<(), FrameError> {
        let now = Instant::now();
        let input = self.clock.tick_at(now);
        let result = self.run_with_input(input, re_arm, body);
        self.stats.record(now, self.frame_count, self.failed_frames);
        result
    }

    fn run_with_input(
        &mut self,
        input: FrameInput,
        re_arm: impl FnOnce(),
        body: impl FnOnce(FrameInput) -> Result<(), FrameError>,
    ) -> Result<(), FrameError> {
        self.state = DriverState::Running;
        re_arm();
        let result = body(input);
        self.state = DriverState::Scheduled;
        self.frame_count += 1;

        if let Err(err) = &result {
            self.failed_frames += 1;
            if err.is_fatal() {
                error!("Frame {} failed fatally: {err}", self.frame_count);
            } else {
                error!("Frame {} failed, continuing: {err}", self.frame_count);
            }
        }
        result
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Frames run so far, failed ones included.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn failed_frames(&self) -> u64 {
        self.failed_frames
    }
}

impl fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLoop")
            .field("state", &self.state)
            .field("frame_count", &self.frame_count)
            .field("failed_frames", &self.failed_frames)
            .finish()
    }
}
