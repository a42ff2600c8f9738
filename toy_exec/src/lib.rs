//! # Toy drive library.
//!
//! Everything the drive tools share: toy backends, the connection guard, joystick command shaping
//! and the live controller, path replay, calibration and battery policy. The binaries in
//! `src/bin` are thin wrappers around these modules.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Toy backends - the SDK bridge client and the in-process simulator
pub mod backend;

/// Battery level classification and reporting
pub mod battery;

/// Operator-assisted heading calibration
pub mod calib;

/// Command line options and start up shared by the binaries
pub mod cli;

/// Connection guard - stops and releases the toy on every exit path
pub mod handle;

/// Interrupt handling
pub mod interrupt;

/// Joystick control - stick shaping, command limiting and the live controller
pub mod joy_ctrl;

/// Parameters for each tool
pub mod params;

/// Path replay - heading/distance segment traversal
pub mod path;

/// Straight line timing runs
pub mod straight;
