//! # Toy Equipment Types

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum drive value accepted by the toy's motors.
pub const MAX_SPEED: u8 = 255;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An RGB colour for the toy's LEDs.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Accelerometer reading.
///
/// Units: g
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Locator reading, the offset of the toy from the point where the locator was last reset.
///
/// Units: centimeters
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

/// A toy found during discovery.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToyInfo {
    /// Advertised name, for example `SB-9DD8`.
    pub name: String,

    /// Hardware address, if the transport exposes one.
    #[serde(default)]
    pub address: Option<String>,

    /// Received signal strength, used to pick the nearest toy.
    #[serde(default)]
    pub rssi: Option<i16>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const YELLOW: Color = Color::new(255, 255, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Acceleration {
    /// Magnitude of the acceleration vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Tilt of the toy about its Y axis, from the X and Z components.
    ///
    /// Units: degrees
    pub fn pitch_deg(&self) -> f64 {
        self.x.atan2(self.z).to_degrees()
    }
}

impl Location {
    /// Straight line distance from the locator origin.
    pub fn distance_from_origin(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl ToyInfo {
    /// Create a record for a toy known only by name.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            address: None,
            rssi: None,
        }
    }

    /// Whether this toy is identified by the given name or address.
    pub fn matches(&self, name_or_address: &str) -> bool {
        self.name == name_or_address || self.address.as_deref() == Some(name_or_address)
    }
}

/// Convert a heading in degrees to the integer representation used by the toy, wrapped into
/// `[0, 360)`.
pub fn heading_from_deg(heading_deg: f64) -> u16 {
    let wrapped = heading_deg.rem_euclid(360.0);

    // rem_euclid can round up to exactly 360 for tiny negative inputs
    (wrapped as u16) % 360
}
