//! # Device Control Facade
//!
//! The tools never talk to a transport directly. Discovery goes through a [`Scanner`] and every
//! drive, LED and sensor call goes through a [`Toy`], so the same control code runs against the
//! SDK bridge or the simulator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use crate::eqpt::{Acceleration, Color, Location, ToyInfo};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by a [`Toy`] or [`Scanner`].
#[derive(thiserror::Error, Debug)]
pub enum ToyError {
    #[error("No toy named \"{0}\" was found")]
    NotFound(String),

    #[error("No toys were found nearby")]
    NoToys,

    #[error("Could not connect to \"{name}\": {reason}")]
    ConnectFailed {
        name: String,
        reason: String
    },

    #[error("Communication with the toy failed: {0}")]
    Comms(String),

    #[error("The toy rejected the request: {0}")]
    Rejected(String),

    #[error("The toy does not support {0}")]
    Unsupported(&'static str),

    #[error("The toy is not connected")]
    Disconnected,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A connected toy.
///
/// Headings are in degrees within `[0, 360)`, speeds are raw drive values. Calls block until the
/// toy acknowledges them, `roll` blocks for its whole duration.
pub trait Toy {
    /// Name of the toy this handle is connected to.
    fn name(&self) -> &str;

    fn set_heading(&mut self, heading_deg: u16) -> Result<(), ToyError>;

    fn get_heading(&mut self) -> Result<u16, ToyError>;

    fn set_speed(&mut self, speed: u8) -> Result<(), ToyError>;

    /// Drive at the given heading and speed for `duration_s` seconds.
    fn roll(&mut self, heading_deg: u16, speed: u8, duration_s: f64) -> Result<(), ToyError>;

    fn set_front_led(&mut self, color: Color) -> Result<(), ToyError>;

    fn set_back_led(&mut self, color: Color) -> Result<(), ToyError>;

    fn set_main_led(&mut self, color: Color) -> Result<(), ToyError>;

    /// Show a single character on the LED matrix.
    fn set_matrix_character(&mut self, character: char, color: Color) -> Result<(), ToyError>;

    fn set_stabilization(&mut self, enabled: bool) -> Result<(), ToyError>;

    /// Units: volts
    fn get_battery_voltage(&mut self) -> Result<f64, ToyError>;

    /// `Ok(None)` when the toy has no accelerometer data available.
    fn get_acceleration(&mut self) -> Result<Option<Acceleration>, ToyError>;

    /// `Ok(None)` when the toy has no locator data available.
    fn get_location(&mut self) -> Result<Option<Location>, ToyError>;

    /// Make the current position the locator origin.
    fn reset_locator(&mut self) -> Result<(), ToyError>;

    /// Enter the toy's aiming mode, showing the heading reference light.
    fn start_calibration(&mut self) -> Result<(), ToyError>;

    /// Leave aiming mode, taking the current orientation as heading zero.
    fn finish_calibration(&mut self) -> Result<(), ToyError>;

    fn disable_collision_detection(&mut self) -> Result<(), ToyError>;

    /// Release the connection. No other call may be made afterwards.
    fn disconnect(&mut self) -> Result<(), ToyError>;

    /// Bring the toy to a halt.
    fn stop(&mut self) -> Result<(), ToyError> {
        self.set_speed(0)
    }
}

/// Discovers toys and connects to them.
pub trait Scanner {
    type Toy: Toy;

    /// List all toys currently visible, nearest first where the transport can tell.
    fn find_toys(&self) -> Result<Vec<ToyInfo>, ToyError>;

    /// Connect to a discovered toy.
    fn connect(&self, info: &ToyInfo) -> Result<Self::Toy, ToyError>;

    /// Find a toy by advertised name or hardware address.
    fn find_toy(&self, name_or_address: &str) -> Result<ToyInfo, ToyError> {
        self.find_toys()?
            .into_iter()
            .find(|t| t.matches(name_or_address))
            .ok_or_else(|| ToyError::NotFound(name_or_address.to_string()))
    }

    /// Find the toy with the strongest signal, or the first one listed if signal strength is not
    /// known.
    fn find_nearest(&self) -> Result<ToyInfo, ToyError> {
        let toys = self.find_toys()?;

        let strongest = toys
            .iter()
            .filter(|t| t.rssi.is_some())
            .max_by_key(|t| t.rssi)
            .cloned();

        strongest
            .or_else(|| toys.into_iter().next())
            .ok_or(ToyError::NoToys)
    }
}

/// A call whose failure does not affect the outcome of the run (LEDs, calibration hints, sensor
/// configuration).
///
/// The failure is logged at debug level and then discarded.
pub trait Advisory {
    fn advisory(self, what: &str);
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T> Advisory for Result<T, ToyError> {
    fn advisory(self, what: &str) {
        if let Err(e) = self {
            debug!("Advisory call \"{}\" failed: {}", what, e);
        }
    }
}
