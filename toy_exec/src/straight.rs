//! # Straight Line Timing
//!
//! Rolls the toy straight along one heading until interrupted and reports the elapsed time. The
//! operator measures the distance covered to work out the toy's speed, which is the `--cmps`
//! value used by the race replay.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Instant;
use log::{info, warn};

use toy_if::{Advisory, Color, Toy, ToyError};
use util::time::sleep_s;

use crate::{
    calib::{self, CalibError, LineInput},
    interrupt::RunFlag,
    params::StraightParams,
    path::pct_to_speed,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

pub const LED_READY: Color = Color::BLUE;
pub const LED_RUN: Color = Color::new(255, 120, 0);
pub const LED_OK: Color = Color::GREEN;
pub const LED_ERR: Color = Color::RED;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// What to drive.
#[derive(Debug, Clone, Copy)]
pub struct StraightRun {
    /// Units: degrees
    pub heading_deg: u16,

    /// Percentage of the maximum speed
    pub speed_pct: f64,

    /// Skip the calibration and use `heading_deg` as is
    pub skip_calibration: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StraightReport {
    /// Time from the start signal to the stop.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// Units: seconds
    pub commanded_s: f64,

    /// False if the run hit its duration limit rather than being interrupted
    pub interrupted: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum StraightError {
    #[error("Calibration failed: {0}")]
    CalibError(#[from] CalibError),

    #[error("Drive command failed: {0}")]
    ToyError(#[from] ToyError),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Prepare the toy, wait for the operator, then roll until `run_flag` is cleared.
///
/// The toy is stopped and shows the success colour on return.
pub fn run_straight<T: Toy>(
    toy: &mut T,
    params: &StraightParams,
    run: &StraightRun,
    input: &LineInput,
    run_flag: &RunFlag
) -> Result<StraightReport, StraightError> {
    let heading_deg = run.heading_deg % 360;
    let speed = pct_to_speed(run.speed_pct);

    toy.set_main_led(LED_READY).advisory("ready LED");
    toy.set_stabilization(true).advisory("stabilization");
    toy.set_back_led(Color::new(0, 0, params.back_led_brightness)).advisory("back LED");

    if run.skip_calibration {
        toy.set_heading(heading_deg)?;
    }
    else {
        calib::calibrate_zero(toy, input, run_flag)?;
    }

    info!("Ready. Align the toy and press ENTER to start");
    input.wait_for_enter(run_flag)?;

    for k in (1..=3).rev() {
        if !run_flag.is_running() {
            break;
        }
        info!("... {}", k);
        toy.set_main_led(Color::YELLOW).advisory("countdown LED");
        sleep_s(params.countdown_on_s);
        toy.set_main_led(Color::BLACK).advisory("countdown LED");
        sleep_s(params.countdown_off_s);
    }

    info!("GO, Ctrl-C to stop");
    toy.set_main_led(LED_RUN).advisory("run LED");

    let start = Instant::now();
    let mut commanded_s = 0.0;

    while run_flag.is_running() && commanded_s < params.max_duration_s {
        toy.roll(heading_deg, speed, params.pulse_s)?;
        commanded_s += params.pulse_s;
    }

    let elapsed_s = start.elapsed().as_secs_f64();
    let interrupted = !run_flag.is_running();

    if !interrupted {
        warn!("Run stopped after the {:.0} s limit", params.max_duration_s);
    }

    toy.stop()?;
    toy.set_main_led(LED_OK).advisory("done LED");

    Ok(StraightReport {
        elapsed_s,
        commanded_s,
        interrupted,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{thread, time::Duration};
    use crate::backend::{sim::test::fast_params, SimCall, SimParams, SimToy};

    fn test_params() -> StraightParams {
        StraightParams {
            max_duration_s: 3.0,
            countdown_on_s: 0.0,
            countdown_off_s: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_run_to_limit_without_calibration() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        let run = StraightRun {
            heading_deg: 450,
            speed_pct: 70.0,
            skip_calibration: true,
        };

        let report = run_straight(
            &mut toy,
            &test_params(),
            &run,
            &LineInput::from_reader("\n".as_bytes()),
            &RunFlag::new()
        ).unwrap();

        assert!(!report.interrupted);
        assert_eq!(report.commanded_s, 3.0);

        let calls = toy.calls();
        assert!(calls.contains(&SimCall::SetHeading(90)));
        assert!(calls.contains(&SimCall::Stabilization(true)));
        assert_eq!(
            calls.iter().filter(|c| matches!(c, SimCall::Roll { speed: 179, .. })).count(),
            3
        );
        assert_eq!(calls[calls.len() - 2], SimCall::SetSpeed(0));
        assert_eq!(calls.last(), Some(&SimCall::MainLed(LED_OK)));
    }

    #[test]
    fn test_interrupt_at_prompt_skips_run() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        let run = StraightRun {
            heading_deg: 0,
            speed_pct: 50.0,
            skip_calibration: false,
        };
        let flag = RunFlag::new();
        flag.stop();

        let result = run_straight(
            &mut toy,
            &test_params(),
            &run,
            &LineInput::from_reader("\n\n".as_bytes()),
            &flag
        );

        assert!(matches!(result, Err(StraightError::CalibError(CalibError::Interrupted))));

        let calls = toy.calls();
        assert!(!calls.contains(&SimCall::FinishCalibration));
        assert!(!calls.contains(&SimCall::MainLed(Color::YELLOW)));
        assert!(!calls.iter().any(|c| matches!(c, SimCall::Roll { .. })));
    }

    #[test]
    fn test_interrupt_while_rolling() {
        let mut toy = SimToy::new("SB-TEST", SimParams { realtime: true, ..fast_params() });
        let params = StraightParams {
            pulse_s: 0.2,
            ..test_params()
        };
        let run = StraightRun {
            heading_deg: 0,
            speed_pct: 50.0,
            skip_calibration: false,
        };
        let flag = RunFlag::new();

        let stopper = {
            let flag = flag.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(100));
                flag.stop();
            })
        };

        let report = run_straight(
            &mut toy,
            &params,
            &run,
            &LineInput::from_reader("\n\n".as_bytes()),
            &flag
        ).unwrap();
        stopper.join().unwrap();

        assert!(report.interrupted);
        assert!((report.commanded_s - 0.2).abs() < 1e-9);

        let calls = toy.calls();
        assert!(calls.contains(&SimCall::FinishCalibration));
        assert_eq!(calls[calls.len() - 2], SimCall::SetSpeed(0));
        assert_eq!(calls.last(), Some(&SimCall::MainLed(LED_OK)));
    }

    #[test]
    fn test_missing_confirmation() {
        let mut toy = SimToy::new("SB-TEST", fast_params());
        let run = StraightRun {
            heading_deg: 0,
            speed_pct: 50.0,
            skip_calibration: true,
        };

        let result = run_straight(
            &mut toy,
            &test_params(),
            &run,
            &LineInput::from_reader("".as_bytes()),
            &RunFlag::new()
        );

        assert!(matches!(result, Err(StraightError::CalibError(CalibError::InputClosed))));
    }
}
