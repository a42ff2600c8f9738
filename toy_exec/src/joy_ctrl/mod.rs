//! # Joystick Control
//!
//! Live drive of one toy from one game controller. The stick vector becomes a heading relative to
//! the toy's current heading and a speed scaled from the selected preset:
//!
//! - [`shaping`] applies the deadzone and response curve and converts the vector,
//! - [`limiter`] drops commands which are too frequent or too similar to the last one sent and
//!   smooths the speed,
//! - [`state`] holds the controller itself: presets, calibration mode, battery and tilt
//!   monitoring.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod limiter;
pub mod pad;
pub mod shaping;
mod state;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use limiter::{CommandShaper, SpeedSmoother};
pub use pad::{GilrsPad, Pad, PadButton, PadError, PadFrame};
pub use shaping::{apply_deadzone_expo, vector_command, DriveCmd};
pub use state::*;
