//! # Tool Parameters
//!
//! Parameters for each tool, loaded from `joy_drive.toml`, `race.toml` and `straight.toml`. Any
//! field missing from a file takes its default value.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use toy_if::MAX_SPEED;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the joystick live drive.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct JoyParams {
    pub shaping: ShapingParams,

    pub limiter: LimiterParams,

    /// Speed preset before any preset button is pressed
    pub initial_speed: u8,

    /// Speed presets selected by buttons 1 to 4
    pub speed_presets: [u8; 4],

    /// Period of one control loop cycle.
    ///
    /// Units: seconds
    pub tick_period_s: f64,

    /// Units: seconds
    pub heading_resample_period_s: f64,

    /// Units: seconds
    pub battery_poll_period_s: f64,

    /// Tilt angle from which the toy is considered to be on a slope.
    ///
    /// Units: degrees
    pub tilt_threshold_deg: f64,

    /// Number of consecutive tilted cycles after which the player is reported as going wild
    pub tilt_count_limit: u32,

    /// Stick deflection along X which nudges the heading in calibration mode
    pub calib_nudge_threshold: f64,

    /// Units: degrees
    pub calib_nudge_deg: f64,

    /// Minimum time between two heading nudges in calibration mode.
    ///
    /// Units: seconds
    pub calib_nudge_period_s: f64,

    /// Number of consecutive failed drive calls after which the run is aborted
    pub max_consecutive_errors: u32,
}

/// Stick response shaping.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct ShapingParams {
    /// Stick magnitude at or below which input is ignored
    pub deadzone: f64,

    /// Response curve exponent offset, 0 is linear
    pub expo: f64,

    pub max_speed: u8,
}

/// Outgoing command limiting.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct LimiterParams {
    /// Units: seconds
    pub min_command_interval_s: f64,

    /// Heading change needed to resend a command, inclusive.
    ///
    /// Units: degrees
    pub min_heading_delta_deg: f64,

    /// Speed change needed to resend a command, inclusive
    pub min_speed_delta: u8,

    /// Weight of the new target in the speed smoothing, between 0 and 1
    pub smooth_alpha: f64,
}

/// Parameters for the race path replay.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RaceParams {
    /// Segment lengths used when none are given on the command line.
    ///
    /// Units: centimeters
    pub segments_cm: Vec<f64>,

    /// Segment headings used when none are given on the command line.
    ///
    /// Units: degrees
    pub headings_deg: Vec<i64>,

    /// Drive speed, as a percentage of the maximum speed
    pub speed_pct: f64,

    /// Distance covered per second at `speed_pct`, measured with `straight`.
    ///
    /// Units: centimeters/second
    pub cmps: f64,

    pub replay: ReplayParams,
}

/// Segment traversal tuning.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct ReplayParams {
    /// Delay between countdown steps.
    ///
    /// Units: seconds
    pub countdown_step_s: f64,

    /// Duration of the zero speed roll after each segment.
    ///
    /// Units: seconds
    pub settle_s: f64,

    /// Duration of each drive pulse under the locator strategy.
    ///
    /// Units: seconds
    pub pulse_s: f64,

    /// Longest single roll under the timed strategy, the interrupt is checked between rolls.
    ///
    /// Units: seconds
    pub timed_pulse_s: f64,

    /// Distance the toy still covers after being told to stop.
    ///
    /// Units: centimeters
    pub braking_margin_cm: f64,

    /// Remaining distance below which the approach speed is used.
    ///
    /// Units: centimeters
    pub approach_distance_cm: f64,

    /// Approach speed, as a percentage of the maximum speed
    pub approach_speed_pct: f64,

    /// The segment time ceiling is `timed_estimate * ceiling_factor + ceiling_margin_s`
    pub ceiling_factor: f64,

    /// Units: seconds
    pub ceiling_margin_s: f64,

    /// Acceleration magnitude above which a collision is assumed.
    ///
    /// Units: g
    pub collision_accel_g: f64,
}

/// Parameters for the straight line timing run.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct StraightParams {
    /// Duration of each drive pulse.
    ///
    /// Units: seconds
    pub pulse_s: f64,

    /// The run stops by itself after this long.
    ///
    /// Units: seconds
    pub max_duration_s: f64,

    /// Back LED brightness during the run
    pub back_led_brightness: u8,

    /// Units: seconds
    pub countdown_on_s: f64,

    /// Units: seconds
    pub countdown_off_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for JoyParams {
    fn default() -> Self {
        Self {
            shaping: ShapingParams::default(),
            limiter: LimiterParams::default(),
            initial_speed: 50,
            speed_presets: [120, 170, 210, 240],
            tick_period_s: 0.01,
            heading_resample_period_s: 1.0,
            battery_poll_period_s: 30.0,
            tilt_threshold_deg: 30.0,
            tilt_count_limit: 10,
            calib_nudge_threshold: 0.7,
            calib_nudge_deg: 5.0,
            calib_nudge_period_s: 0.25,
            max_consecutive_errors: 20,
        }
    }
}

impl Default for ShapingParams {
    fn default() -> Self {
        Self {
            deadzone: 0.15,
            expo: 0.35,
            max_speed: MAX_SPEED,
        }
    }
}

impl Default for LimiterParams {
    fn default() -> Self {
        Self {
            min_command_interval_s: 0.03,
            min_heading_delta_deg: 3.0,
            min_speed_delta: 5,
            smooth_alpha: 0.45,
        }
    }
}

impl Default for RaceParams {
    fn default() -> Self {
        Self {
            segments_cm: vec![200.0, 200.0, 100.0, 100.0, 150.0, 100.0, 100.0, 200.0, 250.0],
            headings_deg: vec![0, 90, 180, 270, 180, 90, 180, 270, 0],
            speed_pct: 70.0,
            // 5 m in 12 s
            cmps: 41.7,
            replay: ReplayParams::default(),
        }
    }
}

impl Default for ReplayParams {
    fn default() -> Self {
        Self {
            countdown_step_s: 0.5,
            settle_s: 0.05,
            pulse_s: 0.1,
            timed_pulse_s: 0.5,
            braking_margin_cm: 2.0,
            approach_distance_cm: 25.0,
            approach_speed_pct: 25.0,
            ceiling_factor: 2.0,
            ceiling_margin_s: 1.0,
            collision_accel_g: 2.5,
        }
    }
}

impl Default for StraightParams {
    fn default() -> Self {
        Self {
            pulse_s: 1.0,
            max_duration_s: 60.0,
            back_led_brightness: 255,
            countdown_on_s: 0.25,
            countdown_off_s: 0.35,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_joy_params() {
        let params: JoyParams = util::params::parse(
            "initial_speed = 80\n\
             [limiter]\n\
             smooth_alpha = 0.6\n"
        ).unwrap();

        assert_eq!(params.initial_speed, 80);
        assert_eq!(params.limiter.smooth_alpha, 0.6);
        assert_eq!(params.limiter.min_speed_delta, 5);
        assert_eq!(params.shaping.deadzone, 0.15);
        assert_eq!(params.speed_presets, [120, 170, 210, 240]);
    }

    #[test]
    fn test_race_defaults_are_consistent() {
        let params = RaceParams::default();
        assert_eq!(params.segments_cm.len(), params.headings_deg.len());
    }
}
