//! Per-frame motion: layer spins plus the Moon's orbit.
//!
//! Spin angles are accumulated in `f64` and written to the node transforms
//! every frame. The orbit is recomputed from the frame time alone, so it
//! never drifts, whereas the spins depend on how many frames have run.

use terra_config::{AnimationConfig, MoonConfig, SpinTiming};

use crate::earth::EarthScene;
use crate::graph::SceneError;
use crate::orbit::{OrbitParams, orbit_position};

/// Frame rate the per-frame spin rates were tuned for. Used to scale the
/// rates when spinning per second.
const REFERENCE_FPS: f64 = 60.0;

/// Radians per step for each spinning layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinRates {
    /// Earth surface, night lights and glow.
    pub surface: f64,
    pub clouds: f64,
    /// Applied with a negative sign: the sky turns against the Earth.
    pub stars: f64,
}

impl From<&AnimationConfig> for SpinRates {
    fn from(config: &AnimationConfig) -> Self {
        Self {
            surface: config.surface_spin,
            clouds: config.cloud_spin,
            stars: config.star_spin,
        }
    }
}

/// Accumulated spin angles in radians. Unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpinAngles {
    pub surface: f64,
    pub clouds: f64,
    pub stars: f64,
}

impl SpinAngles {
    pub fn is_finite(&self) -> bool {
        self.surface.is_finite() && self.clouds.is_finite() && self.stars.is_finite()
    }
}

/// Timing for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
    /// Frame timestamp in clock units, measured from the first frame.
    pub time: f64,
    /// Seconds since the previous frame. Only read when spinning per second.
    pub delta_seconds: f64,
}

impl FrameInput {
    pub fn at(time: f64) -> Self {
        Self {
            time,
            delta_seconds: 1.0 / REFERENCE_FPS,
        }
    }
}

/// What [`Animator::advance`] did with a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Advanced,
    /// The frame timing was unusable; transforms were left as they were.
    MotionSkipped,
}

/// Drives all scene motion.
#[derive(Clone, Debug)]
pub struct Animator {
    rates: SpinRates,
    timing: SpinTiming,
    orbit: OrbitParams,
    angles: SpinAngles,
    frames: u64,
    skipped: u64,
}

impl Animator {
    pub fn new(config: &AnimationConfig, orbit: OrbitParams) -> Self {
        Self {
            rates: SpinRates::from(config),
            timing: config.timing,
            orbit,
            angles: SpinAngles::default(),
            frames: 0,
            skipped: 0,
        }
    }

    /// Animator for the Moon described by `moon`, on the configured clock.
    pub fn from_config(animation: &AnimationConfig, moon: &MoonConfig) -> Self {
        let units = animation.clock_units_per_second;
        if !(units.is_finite() && units > 0.0) {
            log::warn!("clock_units_per_second is {units}; the Moon will not move");
        }
        let orbit = OrbitParams::new(moon.orbit_speed, moon.orbit_distance)
            .with_units_per_second(animation.clock_units_per_second);
        Self::new(animation, orbit)
    }

    /// Apply one frame of motion to `scene`.
    pub fn advance(
        &mut self,
        scene: &mut EarthScene,
        input: FrameInput,
    ) -> Result<FrameOutcome, SceneError> {
        let step = match self.timing {
            SpinTiming::PerFrame => 1.0,
            SpinTiming::PerSecond => input.delta_seconds * REFERENCE_FPS,
        };
        if !input.time.is_finite() || !step.is_finite() {
            log::warn!(
                "Skipping motion for frame with time {} (delta {}s)",
                input.time,
                input.delta_seconds
            );
            self.skipped += 1;
            return Ok(FrameOutcome::MotionSkipped);
        }

        let handles = scene.handles();
        let graph = &mut scene.graph;

        let angles = SpinAngles {
            surface: self.angles.surface + self.rates.surface * step,
            clouds: self.angles.clouds + self.rates.clouds * step,
            stars: self.angles.stars - self.rates.stars * step,
        };
        let primary = graph.transform(handles.earth)?.position;
        let moon = graph.transform(handles.moon)?.position;
        let moon = orbit_position(primary, moon, &self.orbit, input.time);

        // Rates or orbit settings from a bad config poison every later frame.
        if !(angles.is_finite() && moon.is_finite()) {
            log::warn!(
                "Skipping motion: non-finite result at time {} (angles {:?}, moon {}, orbit {:?})",
                input.time,
                angles,
                moon,
                self.orbit
            );
            self.skipped += 1;
            return Ok(FrameOutcome::MotionSkipped);
        }

        for id in [handles.earth, handles.lights, handles.glow] {
            graph.transform_mut(id)?.rotation.y = angles.surface as f32;
        }
        graph.transform_mut(handles.clouds)?.rotation.y = angles.clouds as f32;
        graph.transform_mut(handles.stars)?.rotation.y = angles.stars as f32;
        graph.transform_mut(handles.moon)?.position = moon;

        self.angles = angles;
        self.frames += 1;
        Ok(FrameOutcome::Advanced)
    }

    pub fn angles(&self) -> SpinAngles {
        self.angles
    }

    pub fn orbit(&self) -> &OrbitParams {
        &self.orbit
    }

    /// Frames that moved the scene.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames whose motion was skipped.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}
