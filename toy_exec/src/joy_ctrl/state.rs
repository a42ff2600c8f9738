//! Joystick controller state and control cycle

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{thread, time::Instant};
use log::{debug, info, trace, warn};

use toy_if::{eqpt::heading_from_deg, Advisory, Color, Toy, ToyError};
use util::time::{secs_to_duration, sleep_s};

use super::{vector_command, CommandShaper, Pad, PadButton, PadError, PadFrame};
use crate::{battery, interrupt::RunFlag, params::JoyParams};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Colours associated with each speed preset.
const PRESET_COLORS: [Color; 4] = [
    Color::new(255, 200, 0),
    Color::new(255, 100, 0),
    Color::new(255, 50, 0),
    Color::new(255, 0, 0),
];

/// Main LED colour of the calibrated blink.
const CALIBRATED_BLINK: Color = Color::new(0, 60, 0);

/// Highest player number which can be shown on the matrix.
const MAX_PLAYER: u8 = 5;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Live drive controller for one toy.
pub struct JoyCtrl {
    params: JoyParams,

    player: u8,
    color: Color,

    speed_preset: u8,

    /// Heading the stick's forward direction maps to.
    ///
    /// Units: degrees
    base_heading_deg: f64,

    shaper: CommandShaper,

    calibration_mode: bool,
    game_on: bool,
    game_start: Instant,

    /// Number of consecutive cycles spent tilted beyond the threshold
    tilt_counter: u32,

    calibrate_was_pressed: bool,

    last_heading_resample: Instant,
    last_battery_poll: Instant,
    last_nudge: Option<Instant>,

    consecutive_errors: u32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Quit,
}

#[derive(thiserror::Error, Debug)]
pub enum JoyCtrlError {
    #[error("Player number must be between 1 and 5, got {0}")]
    InvalidPlayer(u8),

    #[error("Controller error: {0}")]
    PadError(#[from] PadError),

    #[error("Battery is critically low, stopping")]
    BatteryCritical,

    #[error("{0} consecutive drive commands failed, last error: {1}")]
    TooManyErrors(u32, ToyError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JoyCtrl {
    /// Create a controller for the given player (1 to 5).
    pub fn new(params: JoyParams, player: u8, now: Instant) -> Result<Self, JoyCtrlError> {
        if player < 1 || player > MAX_PLAYER {
            return Err(JoyCtrlError::InvalidPlayer(player));
        }

        Ok(Self {
            shaper: CommandShaper::new(params.limiter),
            speed_preset: params.initial_speed,
            params,
            player,
            color: Color::RED,
            base_heading_deg: 0.0,
            calibration_mode: false,
            game_on: false,
            game_start: now,
            tilt_counter: 0,
            calibrate_was_pressed: false,
            last_heading_resample: now,
            last_battery_poll: now,
            last_nudge: None,
            consecutive_errors: 0,
        })
    }

    /// Show the player number and run one calibration cycle so the toy starts in game mode with
    /// a known base heading.
    pub fn start<T: Toy>(&mut self, toy: &mut T, now: Instant) -> Result<(), JoyCtrlError> {
        self.display_number(toy);
        self.enter_calibration(toy, 0.0, now)?;
        self.exit_calibration(toy, now);
        Ok(())
    }

    /// Run the control loop until the quit button is pressed or the run flag is cleared.
    pub fn run<T, P>(
        &mut self,
        toy: &mut T,
        pad: &mut P,
        run_flag: &RunFlag
    ) -> Result<(), JoyCtrlError>
    where
        T: Toy,
        P: Pad
    {
        let tick_period = secs_to_duration(self.params.tick_period_s);

        self.start(toy, Instant::now())?;

        info!("Player {} ready to drive {}", self.player, toy.name());

        while run_flag.is_running() {
            let cycle_start = Instant::now();

            let frame = pad.frame()?;

            if self.tick(toy, &frame, cycle_start)? == TickOutcome::Quit {
                info!("Quit requested");
                break;
            }

            // Sleep for the rest of the cycle
            let elapsed = cycle_start.elapsed();
            if elapsed < tick_period {
                thread::sleep(tick_period - elapsed);
            }
        }

        Ok(())
    }

    /// Perform one control cycle.
    pub fn tick<T: Toy>(
        &mut self,
        toy: &mut T,
        frame: &PadFrame,
        now: Instant
    ) -> Result<TickOutcome, JoyCtrlError> {
        if !self.game_on {
            self.game_start = now;
        }

        // ---- BATTERY ----

        if self.elapsed_s(self.last_battery_poll, now) >= self.params.battery_poll_period_s {
            self.last_battery_poll = now;
            match battery::check_battery(toy, self.player) {
                Ok(level) if level.is_critical() => return Err(JoyCtrlError::BatteryCritical),
                Ok(_) => (),
                Err(e) => warn!("Could not read the battery voltage: {}", e)
            }
        }

        // ---- TILT ----

        if self.game_on {
            self.check_tilt(toy, now);
        }

        // ---- BUTTONS ----

        for (i, button) in PadButton::PRESETS.iter().enumerate() {
            if frame.is_pressed(*button) {
                self.select_preset(toy, i);
            }
        }

        let calibrate_pressed = frame.is_pressed(PadButton::Calibrate);
        if calibrate_pressed && !self.calibrate_was_pressed {
            self.toggle_calibration(toy, frame.x, now)?;
        }
        self.calibrate_was_pressed = calibrate_pressed;

        // ---- DRIVE ----

        if self.calibration_mode {
            self.nudge_heading(toy, frame.x, now);
        }
        else {
            let preset = if frame.is_pressed(PadButton::Boost) {
                self.params.shaping.max_speed
            }
            else {
                self.speed_preset
            };

            let cmd = vector_command(
                frame.x,
                frame.y,
                preset,
                self.base_heading_deg,
                &self.params.shaping
            );

            match cmd {
                Some(cmd) if cmd.speed > 0 => {
                    if let Some(sent) = self.shaper.offer(cmd, now) {
                        trace!("Sending heading {:.1} speed {}", sent.heading_deg, sent.speed);
                        let result = toy.set_heading(heading_from_deg(sent.heading_deg))
                            .and_then(|_| toy.set_speed(sent.speed));
                        self.drive_result(result)?;
                    }
                },
                _ => {
                    if self.shaper.stop(now) {
                        let result = toy.set_speed(0);
                        self.drive_result(result)?;
                    }
                }
            }
        }

        // ---- HEADING RESAMPLE ----

        let since_resample_s = self.elapsed_s(self.last_heading_resample, now);
        if since_resample_s >= self.params.heading_resample_period_s {
            match toy.get_heading() {
                Ok(h) => self.base_heading_deg = h as f64,
                Err(e) => debug!("Heading resample failed: {}", e)
            }
            self.last_heading_resample = now;
        }

        if frame.is_pressed(PadButton::Quit) {
            return Ok(TickOutcome::Quit);
        }

        Ok(TickOutcome::Continue)
    }

    /// Show the player number on the matrix, or the player colour on the main LED if the toy
    /// has no matrix.
    pub fn display_number<T: Toy>(&self, toy: &mut T) {
        let character = (b'0' + self.player) as char;

        if let Err(e) = toy.set_matrix_character(character, self.color) {
            debug!("Matrix unavailable ({}), showing the player colour instead", e);
            toy.set_main_led(self.color).advisory("player colour");
        }
    }

    /// Switch between calibration and game mode.
    pub fn toggle_calibration<T: Toy>(
        &mut self,
        toy: &mut T,
        x: f64,
        now: Instant
    ) -> Result<(), JoyCtrlError> {
        if self.calibration_mode {
            self.exit_calibration(toy, now);
            Ok(())
        }
        else {
            self.enter_calibration(toy, x, now)
        }
    }

    /// Stop the toy and enter calibration mode, in which the stick turns the toy on the spot.
    pub fn enter_calibration<T: Toy>(
        &mut self,
        toy: &mut T,
        x: f64,
        now: Instant
    ) -> Result<(), JoyCtrlError> {
        info!("Player {} entering calibration", self.player);

        let result = toy.set_speed(0);
        self.drive_result(result)?;
        self.shaper.reset();

        self.game_start = now;
        self.calibration_mode = true;
        self.game_on = false;

        toy.set_front_led(Color::RED).advisory("calibration front LED");

        match toy.get_heading() {
            Ok(h) => self.base_heading_deg = h as f64,
            Err(e) => debug!("Could not read the heading entering calibration: {}", e)
        }

        let nudge = self.nudge_deg(x);
        self.base_heading_deg += nudge;
        toy.set_heading(heading_from_deg(self.base_heading_deg)).advisory("calibration heading");
        self.last_nudge = Some(now);

        Ok(())
    }

    /// Leave calibration mode and start a new game.
    pub fn exit_calibration<T: Toy>(&mut self, toy: &mut T, now: Instant) {
        info!("Player {} calibrated, game on", self.player);

        self.calibration_mode = false;
        self.game_on = true;
        self.game_start = now;
        self.tilt_counter = 0;

        toy.set_front_led(Color::GREEN).advisory("game front LED");

        toy.set_main_led(CALIBRATED_BLINK).advisory("calibrated blink");
        sleep_s(0.1);
        toy.set_main_led(Color::BLACK).advisory("calibrated blink");
        sleep_s(0.05);
        toy.set_main_led(self.color).advisory("player colour");
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration_mode
    }

    pub fn is_game_on(&self) -> bool {
        self.game_on
    }

    pub fn speed_preset(&self) -> u8 {
        self.speed_preset
    }

    pub fn tilt_counter(&self) -> u32 {
        self.tilt_counter
    }

    pub fn base_heading_deg(&self) -> f64 {
        self.base_heading_deg
    }

    fn select_preset<T: Toy>(&mut self, toy: &mut T, index: usize) {
        let speed = self.params.speed_presets[index];
        let color = PRESET_COLORS[index];

        if speed == self.speed_preset && color == self.color {
            return;
        }

        info!("Player {} speed preset {} ({})", self.player, index + 1, speed);

        self.speed_preset = speed;
        self.color = color;
        self.display_number(toy);
    }

    fn check_tilt<T: Toy>(&mut self, toy: &mut T, now: Instant) {
        let accel = match toy.get_acceleration() {
            Ok(Some(a)) => a,
            Ok(None) => {
                trace!("Acceleration data is not available");
                return;
            },
            Err(e) => {
                debug!("Could not read the acceleration: {}", e);
                return;
            }
        };

        if accel.pitch_deg().abs() >= self.params.tilt_threshold_deg {
            self.tilt_counter += 1;

            if self.tilt_counter == self.params.tilt_count_limit + 1 {
                info!(
                    "Player {} going wild after {:.1} s",
                    self.player,
                    self.elapsed_s(self.game_start, now)
                );
            }
        }
        else {
            self.tilt_counter = 0;
        }
    }

    fn nudge_heading<T: Toy>(&mut self, toy: &mut T, x: f64, now: Instant) {
        let nudge = self.nudge_deg(x);
        if nudge == 0.0 {
            return;
        }

        if let Some(t) = self.last_nudge {
            if self.elapsed_s(t, now) < self.params.calib_nudge_period_s {
                return;
            }
        }

        self.base_heading_deg += nudge;
        toy.set_heading(heading_from_deg(self.base_heading_deg)).advisory("calibration heading");
        self.last_nudge = Some(now);
    }

    fn nudge_deg(&self, x: f64) -> f64 {
        if x < -self.params.calib_nudge_threshold {
            -self.params.calib_nudge_deg
        }
        else if x > self.params.calib_nudge_threshold {
            self.params.calib_nudge_deg
        }
        else {
            0.0
        }
    }

    /// Count failed drive calls, giving up after too many in a row.
    fn drive_result(&mut self, result: Result<(), ToyError>) -> Result<(), JoyCtrlError> {
        match result {
            Ok(()) => {
                self.consecutive_errors = 0;
                Ok(())
            },
            Err(e) => {
                self.consecutive_errors += 1;
                warn!("Drive command failed ({} in a row): {}", self.consecutive_errors, e);

                if self.consecutive_errors >= self.params.max_consecutive_errors {
                    Err(JoyCtrlError::TooManyErrors(self.consecutive_errors, e))
                }
                else {
                    Ok(())
                }
            }
        }
    }

    fn elapsed_s(&self, since: Instant, now: Instant) -> f64 {
        now.saturating_duration_since(since).as_secs_f64()
    }
}
