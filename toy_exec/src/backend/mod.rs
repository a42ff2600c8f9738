//! # Toy Backends
//!
//! Two implementations of the [`toy_if::Scanner`]/[`toy_if::Toy`] facade:
//!
//! - [`bridge`]: forwards every call to the SDK bridge process over zmq. Used with real toys.
//! - [`sim`]: a kinematic simulation running in-process. Used with `--sim` and in tests.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod bridge;
pub mod sim;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use bridge::{BridgeScanner, BridgeToy};
pub use sim::{SimCall, SimParams, SimScanner, SimToy};
