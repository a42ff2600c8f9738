//! # Simulated Toy
//!
//! A simple kinematic model of the toy. Rolls move the toy along its heading at
//! `cmps_per_unit` cm/s per unit of drive speed and the locator reports the resulting offset.
//! Continuous driving through `set_speed` changes the reported speed but does not move the toy.
//!
//! Every command is recorded so tests can check exactly what a controller sent.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, collections::VecDeque, rc::Rc};
use log::debug;
use serde::Deserialize;

use toy_if::{Acceleration, Color, Location, Scanner, Toy, ToyError, ToyInfo};
use util::time::sleep_s;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Simulation parameters, loaded from `sim.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Names of the toys the simulated scanner will report
    pub toy_names: Vec<String>,

    /// Distance covered per second for each unit of drive speed.
    ///
    /// Units: centimeters/second
    pub cmps_per_unit: f64,

    /// Units: volts
    pub battery_volts: f64,

    /// If true rolls block for their duration like a real toy
    pub realtime: bool,

    pub has_locator: bool,

    pub has_matrix: bool,

    /// If false the calibration calls are rejected, as on toys without an aiming mode
    pub has_calibration: bool,
}

/// Scanner reporting simulated toys.
pub struct SimScanner {
    params: SimParams,
}

/// A simulated toy.
pub struct SimToy {
    name: String,
    params: SimParams,
    connected: bool,

    heading_deg: u16,
    speed: u8,
    position: Location,
    locator_origin: Location,
    clock_s: f64,

    accel_queue: VecDeque<Acceleration>,
    location_reads_left: Option<usize>,

    calls: CallLog,
}

/// Shared record of the commands sent to a [`SimToy`], readable after the toy has been dropped.
pub type CallLog = Rc<RefCell<Vec<SimCall>>>;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command received by a [`SimToy`].
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    SetHeading(u16),
    SetSpeed(u8),
    Roll { heading_deg: u16, speed: u8, duration_s: f64 },
    FrontLed(Color),
    BackLed(Color),
    MainLed(Color),
    Matrix(char, Color),
    Stabilization(bool),
    ResetLocator,
    StartCalibration,
    FinishCalibration,
    DisableCollisionDetection,
    Disconnect,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            toy_names: vec![
                "SB-9DD8".into(),
                "SB-2BBE".into(),
                "SB-27A5".into(),
                "SB-81E0".into(),
                "SB-7740".into(),
            ],
            // 41.7 cm/s at 70 % drive
            cmps_per_unit: 41.7 / 179.0,
            battery_volts: 4.0,
            realtime: true,
            has_locator: true,
            has_matrix: true,
            has_calibration: true,
        }
    }
}

impl SimScanner {
    pub fn new(params: SimParams) -> Self {
        Self { params }
    }
}

impl Scanner for SimScanner {
    type Toy = SimToy;

    fn find_toys(&self) -> Result<Vec<ToyInfo>, ToyError> {
        Ok(self.params.toy_names
            .iter()
            .enumerate()
            .map(|(i, n)| ToyInfo {
                name: n.clone(),
                address: Some(format!("5A:1B:00:00:00:{:02X}", i)),
                rssi: Some(-40 - 5 * i as i16),
            })
            .collect())
    }

    fn connect(&self, info: &ToyInfo) -> Result<Self::Toy, ToyError> {
        debug!("Connecting to simulated toy {}", info.name);
        Ok(SimToy::new(&info.name, self.params.clone()))
    }
}

impl SimToy {
    pub fn new(name: &str, params: SimParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            connected: true,
            heading_deg: 0,
            speed: 0,
            position: Location::default(),
            locator_origin: Location::default(),
            clock_s: 0.0,
            accel_queue: VecDeque::new(),
            location_reads_left: None,
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A copy of every command received so far.
    pub fn calls(&self) -> Vec<SimCall> {
        self.calls.borrow().clone()
    }

    /// Shared handle on the command record.
    pub fn call_log(&self) -> CallLog {
        self.calls.clone()
    }

    /// Queue accelerometer readings to be returned, in order, before the toy goes back to
    /// reporting rest (1 g on Z).
    pub fn push_acceleration(&mut self, accel: Acceleration) {
        self.accel_queue.push_back(accel);
    }

    /// Make locator reads fail after `reads` more successful reads.
    pub fn fail_location_after(&mut self, reads: usize) {
        self.location_reads_left = Some(reads);
    }

    pub fn set_battery_volts(&mut self, volts: f64) {
        self.params.battery_volts = volts;
    }

    /// Total commanded drive time.
    ///
    /// Units: seconds
    pub fn clock_s(&self) -> f64 {
        self.clock_s
    }

    /// Position relative to where the toy was connected.
    pub fn position(&self) -> Location {
        self.position
    }

    pub fn heading(&self) -> u16 {
        self.heading_deg
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn record(&mut self, call: SimCall) -> Result<(), ToyError> {
        if !self.connected {
            return Err(ToyError::Disconnected);
        }
        self.calls.borrow_mut().push(call);
        Ok(())
    }

    fn check_connected(&self) -> Result<(), ToyError> {
        if self.connected { Ok(()) } else { Err(ToyError::Disconnected) }
    }
}

impl Toy for SimToy {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_heading(&mut self, heading_deg: u16) -> Result<(), ToyError> {
        self.record(SimCall::SetHeading(heading_deg))?;
        self.heading_deg = heading_deg % 360;
        Ok(())
    }

    fn get_heading(&mut self) -> Result<u16, ToyError> {
        self.check_connected()?;
        Ok(self.heading_deg)
    }

    fn set_speed(&mut self, speed: u8) -> Result<(), ToyError> {
        self.record(SimCall::SetSpeed(speed))?;
        self.speed = speed;
        Ok(())
    }

    fn roll(&mut self, heading_deg: u16, speed: u8, duration_s: f64) -> Result<(), ToyError> {
        self.record(SimCall::Roll { heading_deg, speed, duration_s })?;

        if self.params.realtime {
            sleep_s(duration_s);
        }

        let duration_s = duration_s.max(0.0);
        let dist_cm = speed as f64 * self.params.cmps_per_unit * duration_s;
        let heading_rad = (heading_deg as f64).to_radians();

        // Heading 0 is +Y, heading 90 is +X
        self.position.x += dist_cm * heading_rad.sin();
        self.position.y += dist_cm * heading_rad.cos();
        self.heading_deg = heading_deg % 360;
        self.clock_s += duration_s;
        self.speed = 0;

        Ok(())
    }

    fn set_front_led(&mut self, color: Color) -> Result<(), ToyError> {
        self.record(SimCall::FrontLed(color))
    }

    fn set_back_led(&mut self, color: Color) -> Result<(), ToyError> {
        self.record(SimCall::BackLed(color))
    }

    fn set_main_led(&mut self, color: Color) -> Result<(), ToyError> {
        self.record(SimCall::MainLed(color))
    }

    fn set_matrix_character(&mut self, character: char, color: Color) -> Result<(), ToyError> {
        self.check_connected()?;
        if !self.params.has_matrix {
            return Err(ToyError::Unsupported("LED matrix"));
        }
        self.record(SimCall::Matrix(character, color))
    }

    fn set_stabilization(&mut self, enabled: bool) -> Result<(), ToyError> {
        self.record(SimCall::Stabilization(enabled))
    }

    fn get_battery_voltage(&mut self) -> Result<f64, ToyError> {
        self.check_connected()?;
        Ok(self.params.battery_volts)
    }

    fn get_acceleration(&mut self) -> Result<Option<Acceleration>, ToyError> {
        self.check_connected()?;
        Ok(Some(self.accel_queue
            .pop_front()
            .unwrap_or(Acceleration { x: 0.0, y: 0.0, z: 1.0 })))
    }

    fn get_location(&mut self) -> Result<Option<Location>, ToyError> {
        self.check_connected()?;
        if !self.params.has_locator {
            return Ok(None);
        }

        match self.location_reads_left {
            Some(0) => return Err(ToyError::Comms("simulated locator failure".into())),
            Some(ref mut n) => *n -= 1,
            None => ()
        }

        Ok(Some(Location {
            x: self.position.x - self.locator_origin.x,
            y: self.position.y - self.locator_origin.y,
        }))
    }

    fn reset_locator(&mut self) -> Result<(), ToyError> {
        self.check_connected()?;
        if !self.params.has_locator {
            return Err(ToyError::Unsupported("locator"));
        }
        self.record(SimCall::ResetLocator)?;
        self.locator_origin = self.position;
        Ok(())
    }

    fn start_calibration(&mut self) -> Result<(), ToyError> {
        self.check_connected()?;
        if !self.params.has_calibration {
            return Err(ToyError::Unsupported("calibration"));
        }
        self.record(SimCall::StartCalibration)
    }

    fn finish_calibration(&mut self) -> Result<(), ToyError> {
        self.check_connected()?;
        if !self.params.has_calibration {
            return Err(ToyError::Unsupported("calibration"));
        }
        self.record(SimCall::FinishCalibration)?;
        self.heading_deg = 0;
        Ok(())
    }

    fn disable_collision_detection(&mut self) -> Result<(), ToyError> {
        self.record(SimCall::DisableCollisionDetection)
    }

    fn disconnect(&mut self) -> Result<(), ToyError> {
        self.record(SimCall::Disconnect)?;
        self.connected = false;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    /// Simulation parameters for tests: no real-time sleeps.
    pub(crate) fn fast_params() -> SimParams {
        SimParams {
            realtime: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_roll_moves_along_heading() {
        let mut toy = SimToy::new("SB-TEST", SimParams { cmps_per_unit: 1.0, ..fast_params() });

        toy.roll(0, 100, 1.0).unwrap();
        toy.roll(90, 50, 2.0).unwrap();

        let loc = toy.get_location().unwrap().unwrap();
        assert!((loc.x - 100.0).abs() < 1e-9);
        assert!((loc.y - 100.0).abs() < 1e-9);
        assert_eq!(toy.heading(), 90);
        assert_eq!(toy.clock_s(), 3.0);

        toy.reset_locator().unwrap();
        let loc = toy.get_location().unwrap().unwrap();
        assert_eq!(loc.distance_from_origin(), 0.0);
    }

    #[test]
    fn test_disconnected_toy_rejects_calls() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        toy.disconnect().unwrap();
        assert!(matches!(toy.set_speed(10), Err(ToyError::Disconnected)));
        assert!(matches!(toy.get_location(), Err(ToyError::Disconnected)));
        assert_eq!(toy.calls(), vec![SimCall::Disconnect]);
    }

    #[test]
    fn test_location_failure_injection() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        toy.fail_location_after(1);
        assert!(toy.get_location().is_ok());
        assert!(toy.get_location().is_err());
    }

    #[test]
    fn test_scanner_finds_by_name_and_nearest() {
        let scanner = SimScanner::new(fast_params());
        assert_eq!(scanner.find_toy("SB-27A5").unwrap().name, "SB-27A5");
        assert_eq!(scanner.find_nearest().unwrap().name, "SB-9DD8");
        assert!(scanner.find_toy("SB-0000").is_err());
    }
}
