//! Circular orbit placement of a satellite around a primary body.
//!
//! The satellite's horizontal position is a pure function of elapsed time:
//!
//! ```text
//! phase = time * speed / units_per_second
//! x = -(cos(phase) * distance + primary.x)
//! z = -(sin(phase) * distance + primary.z)
//! ```
//!
//! The negation mirrors the trigonometric point through the origin, putting
//! the satellite on the opposite side of where `(cos, sin)` would place it.
//! The vertical coordinate is never touched.

use glam::Vec3;

/// Fixed orbit settings of one satellite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitParams {
    /// Angular-rate coefficient in radians per second. The sign picks the
    /// direction of travel.
    pub speed: f64,
    /// Orbital radius. Negative values mirror the orbit.
    pub distance: f64,
    /// Ticks per second of the time values passed in (1000 for milliseconds).
    pub units_per_second: f64,
}

impl OrbitParams {
    /// Orbit driven by a millisecond clock.
    pub const fn new(speed: f64, distance: f64) -> Self {
        Self {
            speed,
            distance,
            units_per_second: 1000.0,
        }
    }

    pub const fn with_units_per_second(mut self, units_per_second: f64) -> Self {
        self.units_per_second = units_per_second;
        self
    }

    /// Phase angle in radians at `time`.
    pub fn phase(&self, time: f64) -> f64 {
        time * self.speed / self.units_per_second
    }

    /// Time for one full revolution, in clock units. Infinite for `speed == 0`.
    pub fn period(&self) -> f64 {
        std::f64::consts::TAU * self.units_per_second / self.speed.abs()
    }
}

/// Position of the satellite at `time`, keeping `satellite.y`.
pub fn orbit_position(primary: Vec3, satellite: Vec3, params: &OrbitParams, time: f64) -> Vec3 {
    let phase = params.phase(time);
    let x_movement = phase.cos() * params.distance;
    let z_movement = phase.sin() * params.distance;
    Vec3::new(
        -(x_movement + f64::from(primary.x)) as f32,
        satellite.y,
        -(z_movement + f64::from(primary.z)) as f32,
    )
}

/// Move `satellite` to its orbit position at `time`.
pub fn orbit_body(primary: Vec3, satellite: &mut Vec3, params: &OrbitParams, time: f64) {
    *satellite = orbit_position(primary, *satellite, params, time);
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOON: OrbitParams = OrbitParams::new(0.5, 3.0);

    fn close(a: Vec3, b: Vec3, tol: f32) -> bool {
        (a - b).abs().max_element() < tol
    }

    #[test]
    fn test_time_zero_sits_on_negative_x() {
        let primary = Vec3::new(0.25, -4.0, 0.75);
        let pos = orbit_position(primary, Vec3::new(9.0, 1.0, 9.0), &MOON, 0.0);
        assert_eq!(pos, Vec3::new(-(3.0 + 0.25), 1.0, -0.75));
    }

    #[test]
    fn test_one_second_at_half_speed() {
        let pos = orbit_position(Vec3::ZERO, Vec3::new(-3.0, 1.0, 0.0), &MOON, 1000.0);
        assert!(close(pos, Vec3::new(-2.6327, 1.0, -1.4383), 1e-3), "{pos:?}");
        assert!(((-pos.x) - (0.5f32.cos() * 3.0)).abs() < 1e-6);
        assert!(((-pos.z) - (0.5f32.sin() * 3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_periodic() {
        let period = MOON.period();
        assert!((period - 2000.0 * std::f64::consts::PI / 0.5).abs() < 1e-9);
        for time in [0.0, 17.0, 1234.5, 98_765.0] {
            let a = orbit_position(Vec3::ZERO, Vec3::Y, &MOON, time);
            let b = orbit_position(Vec3::ZERO, Vec3::Y, &MOON, time + period);
            assert!(close(a, b, 1e-5), "t={time}: {a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_pure_for_identical_inputs() {
        let primary = Vec3::new(0.1, 0.2, 0.3);
        let a = orbit_position(primary, Vec3::Y, &MOON, 4321.0);
        let b = orbit_position(primary, Vec3::Y, &MOON, 4321.0);
        assert_eq!(a.to_array().map(f32::to_bits), b.to_array().map(f32::to_bits));
    }

    #[test]
    fn test_height_is_untouched() {
        let mut moon = Vec3::new(-3.0, 1.0, 0.0);
        for t in [0.0, 500.0, 7000.0] {
            orbit_body(Vec3::ZERO, &mut moon, &MOON, t);
            assert_eq!(moon.y, 1.0);
        }
    }

    #[test]
    fn test_radius_is_constant_around_origin() {
        for t in (0..50).map(|i| f64::from(i) * 333.0) {
            let p = orbit_position(Vec3::ZERO, Vec3::ZERO, &MOON, t);
            assert!((p.length() - 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_zero_distance_sits_on_mirrored_primary() {
        let params = OrbitParams::new(0.5, 0.0);
        let pos = orbit_position(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, &params, 999.0);
        assert_eq!(pos, Vec3::new(-1.0, 0.0, -3.0));
    }

    #[test]
    fn test_negative_speed_reverses_direction() {
        let forward = orbit_position(Vec3::ZERO, Vec3::ZERO, &MOON, 500.0);
        let reverse = orbit_position(Vec3::ZERO, Vec3::ZERO, &OrbitParams::new(-0.5, 3.0), 500.0);
        assert!((forward.x - reverse.x).abs() < 1e-6);
        assert!((forward.z + reverse.z).abs() < 1e-6);
    }

    #[test]
    fn test_second_based_clock() {
        let seconds = MOON.with_units_per_second(1.0);
        let a = orbit_position(Vec3::ZERO, Vec3::ZERO, &seconds, 1.0);
        let b = orbit_position(Vec3::ZERO, Vec3::ZERO, &MOON, 1000.0);
        assert!(close(a, b, 1e-6));
    }
}
