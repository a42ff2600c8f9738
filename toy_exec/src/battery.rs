//! # Battery Monitoring
//!
//! Classifies the battery voltage into levels shown on the front LED. Below the hard floor the toy
//! must not keep driving.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use toy_if::{Advisory, Color, Toy, ToyError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Units: volts
const FULL_ABOVE_V: f64 = 4.1;

/// Units: volts
const GOOD_ABOVE_V: f64 = 3.9;

/// Units: volts
const LOW_FROM_V: f64 = 3.7;

/// Hard floor, below this the run is terminated.
///
/// Units: volts
const CRITICAL_BELOW_V: f64 = 3.5;

const ORANGE: Color = Color::new(255, 100, 0);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryLevel {
    Full,
    Good,
    Low,
    VeryLow,
    Critical,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BatteryLevel {
    pub fn from_voltage(volts: f64) -> Self {
        if volts > FULL_ABOVE_V {
            BatteryLevel::Full
        }
        else if volts > GOOD_ABOVE_V {
            BatteryLevel::Good
        }
        else if volts >= LOW_FROM_V {
            BatteryLevel::Low
        }
        else if volts >= CRITICAL_BELOW_V {
            BatteryLevel::VeryLow
        }
        else {
            BatteryLevel::Critical
        }
    }

    /// Front LED colour showing this level.
    pub fn led_color(&self) -> Color {
        match self {
            BatteryLevel::Full => Color::GREEN,
            BatteryLevel::Good => Color::YELLOW,
            BatteryLevel::Low => ORANGE,
            BatteryLevel::VeryLow | BatteryLevel::Critical => Color::RED,
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, BatteryLevel::Critical)
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read the battery voltage, log it and show the level on the front LED.
pub fn check_battery<T: Toy>(toy: &mut T, player: u8) -> Result<BatteryLevel, ToyError> {
    let volts = toy.get_battery_voltage()?;
    let level = BatteryLevel::from_voltage(volts);

    info!("Battery status of player {}: {:.2} V ({:?})", player, volts, level);
    if level.is_critical() {
        warn!("Battery of player {} is critically low", player);
    }

    toy.set_front_led(level.led_color()).advisory("battery front LED");

    Ok(level)
}
