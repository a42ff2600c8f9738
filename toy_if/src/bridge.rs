//! # SDK Bridge Messages
//!
//! The vendor SDK only exists as a python library, so the tools reach it through a small bridge
//! process which wraps the SDK and answers JSON requests on a zmq REP socket. Each request maps
//! onto one SDK call. The bridge holds at most one toy connection per client socket.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::eqpt::{Acceleration, Color, Location, ToyInfo};
use crate::toy::ToyError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Requests sent from a tool to the bridge.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "req", rename_all = "snake_case")]
pub enum BridgeRequest {
    FindToys,
    Connect { name: String },
    Disconnect,
    SetHeading { heading_deg: u16 },
    GetHeading,
    SetSpeed { speed: u8 },
    Roll { heading_deg: u16, speed: u8, duration_s: f64 },
    SetFrontLed { color: Color },
    SetBackLed { color: Color },
    SetMainLed { color: Color },
    SetMatrixCharacter { character: char, color: Color },
    SetStabilization { enabled: bool },
    GetBatteryVoltage,
    GetAcceleration,
    GetLocation,
    ResetLocator,
    StartCalibration,
    FinishCalibration,
    DisableCollisionDetection,
}

/// Responses sent from the bridge back to a tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "rsp", rename_all = "snake_case")]
pub enum BridgeResponse {
    /// The request was carried out and has no return value
    Ok,

    Toys { toys: Vec<ToyInfo> },

    Heading { heading_deg: u16 },

    BatteryVoltage { volts: f64 },

    Acceleration { accel: Option<Acceleration> },

    Location { loc: Option<Location> },

    /// The connected toy has no hardware for this request
    Unsupported,

    /// The request was made while no toy is connected
    NotConnected,

    /// The SDK raised an error
    Error { msg: String },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl BridgeRequest {
    /// Short name of the request, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeRequest::FindToys => "find_toys",
            BridgeRequest::Connect { .. } => "connect",
            BridgeRequest::Disconnect => "disconnect",
            BridgeRequest::SetHeading { .. } => "set_heading",
            BridgeRequest::GetHeading => "get_heading",
            BridgeRequest::SetSpeed { .. } => "set_speed",
            BridgeRequest::Roll { .. } => "roll",
            BridgeRequest::SetFrontLed { .. } => "set_front_led",
            BridgeRequest::SetBackLed { .. } => "set_back_led",
            BridgeRequest::SetMainLed { .. } => "set_main_led",
            BridgeRequest::SetMatrixCharacter { .. } => "set_matrix_character",
            BridgeRequest::SetStabilization { .. } => "set_stabilization",
            BridgeRequest::GetBatteryVoltage => "get_battery_voltage",
            BridgeRequest::GetAcceleration => "get_acceleration",
            BridgeRequest::GetLocation => "get_location",
            BridgeRequest::ResetLocator => "reset_locator",
            BridgeRequest::StartCalibration => "start_calibration",
            BridgeRequest::FinishCalibration => "finish_calibration",
            BridgeRequest::DisableCollisionDetection => "disable_collision_detection",
        }
    }
}

impl BridgeResponse {
    /// Convert a failure response into the matching [`ToyError`].
    ///
    /// Successful responses are returned unchanged.
    pub fn into_result(self, request: &'static str) -> Result<Self, ToyError> {
        match self {
            BridgeResponse::Unsupported => Err(ToyError::Unsupported(request)),
            BridgeResponse::NotConnected => Err(ToyError::Disconnected),
            BridgeResponse::Error { msg } => Err(ToyError::Rejected(msg)),
            r => Ok(r),
        }
    }
}
