//! Stick shaping and vector to drive command conversion

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use util::maths::{clamp, wrap_deg};

use crate::params::ShapingParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A heading and speed demand for the toy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCmd {
    /// Units: degrees, in `[0, 360)`
    pub heading_deg: f64,

    pub speed: u8,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Apply the circular deadzone and the expo response curve to a stick magnitude.
///
/// Magnitudes at or below `deadzone` give exactly 0. Above it the magnitude is renormalised to
/// `[0, 1]` and raised to the power `1 + expo`, so `expo = 0` is linear and larger values make
/// the centre of the stick less sensitive.
pub fn apply_deadzone_expo(magnitude: f64, deadzone: f64, expo: f64) -> f64 {
    if magnitude <= deadzone {
        return 0.0;
    }

    let norm = (magnitude - deadzone) / (1.0 - deadzone);

    if expo <= 0.0 {
        clamp(norm, 0.0, 1.0)
    }
    else {
        clamp(norm.powf(1.0 + expo), 0.0, 1.0)
    }
}

/// Convert a stick vector into a drive command.
///
/// `x` is positive to the right and `y` positive downwards. Pushing the stick forward drives
/// along `base_heading_deg`, pushing it right drives 90 degrees clockwise of it. Returns `None`
/// inside the deadzone.
pub fn vector_command(
    x: f64,
    y: f64,
    preset_speed: u8,
    base_heading_deg: f64,
    params: &ShapingParams
) -> Option<DriveCmd> {
    let magnitude = x.hypot(y).min(1.0);

    let adj = apply_deadzone_expo(magnitude, params.deadzone, params.expo);
    if adj == 0.0 {
        return None;
    }

    let angle_deg = x.atan2(-y).to_degrees();
    let heading_deg = wrap_deg(base_heading_deg + angle_deg);

    let speed = clamp(preset_speed as f64 * adj, 0.0, params.max_speed as f64) as u8;

    Some(DriveCmd {
        heading_deg,
        speed,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deadzone_gives_zero() {
        for i in 0..=15 {
            let mag = i as f64 * 0.01;
            assert_eq!(apply_deadzone_expo(mag, 0.15, 0.35), 0.0);
        }
        assert!(apply_deadzone_expo(0.16, 0.15, 0.35) > 0.0);
    }

    #[test]
    fn test_full_deflection_linear() {
        assert_eq!(apply_deadzone_expo(1.0, 0.15, 0.0), 1.0);
        assert_eq!(apply_deadzone_expo(1.0, 0.15, 0.35), 1.0);
    }

    #[test]
    fn test_expo_softens_centre() {
        let linear = apply_deadzone_expo(0.5, 0.15, 0.0);
        let curved = apply_deadzone_expo(0.5, 0.15, 0.35);
        assert!(curved < linear);
        assert!(curved > 0.0);
    }

    #[test]
    fn test_headings() {
        let params = ShapingParams::default();

        let fwd = vector_command(0.0, -1.0, 200, 0.0, &params).unwrap();
        assert_eq!(fwd.heading_deg, 0.0);
        assert_eq!(fwd.speed, 200);

        let right = vector_command(1.0, 0.0, 200, 0.0, &params).unwrap();
        assert!((right.heading_deg - 90.0).abs() < 1e-9);

        let left = vector_command(-1.0, 0.0, 200, 0.0, &params).unwrap();
        assert!((left.heading_deg - 270.0).abs() < 1e-9);

        let back = vector_command(0.0, 1.0, 200, 0.0, &params).unwrap();
        assert!((back.heading_deg - 180.0).abs() < 1e-9);

        let rotated = vector_command(0.0, -1.0, 200, 350.0, &params).unwrap();
        assert_eq!(rotated.heading_deg, 350.0);

        let wrapped = vector_command(1.0, 0.0, 200, 300.0, &params).unwrap();
        assert!((wrapped.heading_deg - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_heading_always_in_range() {
        let params = ShapingParams::default();

        for i in 0..72 {
            let a = (i as f64 * 5.0).to_radians();
            for base in &[0.0, 90.0, 359.0, -45.0, 720.0] {
                let cmd = vector_command(a.sin(), -a.cos(), 150, *base, &params).unwrap();
                assert!(cmd.heading_deg >= 0.0 && cmd.heading_deg < 360.0);
            }
        }
    }

    #[test]
    fn test_deadzone_gives_no_command() {
        let params = ShapingParams::default();
        assert_eq!(vector_command(0.1, 0.1, 240, 0.0, &params), None);
        assert_eq!(vector_command(0.0, 0.0, 240, 0.0, &params), None);
    }

    #[test]
    fn test_speed_clamped_and_truncated() {
        let params = ShapingParams {
            max_speed: 100,
            ..Default::default()
        };
        // Beyond unit magnitude is clamped to 1
        assert_eq!(vector_command(3.0, -4.0, 240, 0.0, &params).unwrap().speed, 100);

        let params = ShapingParams {
            deadzone: 0.0,
            expo: 0.0,
            ..Default::default()
        };
        assert_eq!(vector_command(0.0, -0.5, 101, 0.0, &params).unwrap().speed, 50);
    }
}
