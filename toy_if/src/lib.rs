//! # Toy interface crate.
//!
//! Provides the interfaces shared by every tool: the device facade traits, the equipment value
//! types passed through them, and the messages exchanged with the SDK bridge process.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Value types for toy equipment (LEDs, sensors, discovery records)
pub mod eqpt;

/// Device control facade traits and errors
pub mod toy;

/// Request and response definitions for the SDK bridge
pub mod bridge;

/// Network module
pub mod net;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use eqpt::{Acceleration, Color, Location, ToyInfo, MAX_SPEED};
pub use toy::{Advisory, Scanner, Toy, ToyError};
