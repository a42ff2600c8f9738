//! # Heading Calibration
//!
//! The operator turns the toy so its heading reference light points along the intended zero
//! direction and confirms on the terminal. Toys without an aiming mode have their current heading
//! forced to zero instead.
//!
//! Terminal lines are read on a background thread ([`LineInput`]) so a wait for the operator
//! ends as soon as the run flag is cleared.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    io::{self, BufRead},
    sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender},
    thread,
};
use log::{debug, info, warn};

use toy_if::{Advisory, Toy, ToyError};
use util::time::secs_to_duration;

use crate::interrupt::RunFlag;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Period at which the run flag is checked while waiting for a line.
///
/// Units: seconds
const INPUT_POLL_PERIOD_S: f64 = 0.05;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Operator input, one line at a time.
pub struct LineInput {
    lines: Receiver<io::Result<String>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How heading zero was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibOutcome {
    /// The toy's aiming mode took the operator's alignment as zero
    Aimed,

    /// Aiming mode was unavailable, the current heading was set to zero
    ForcedZero,
}

#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    #[error("Could not read the operator's confirmation: {0}")]
    Input(io::Error),

    #[error("Input closed before the operator confirmed")]
    InputClosed,

    #[error("Interrupted while waiting for the operator")]
    Interrupted,

    #[error("Could not set the heading: {0}")]
    Toy(ToyError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LineInput {
    /// Read lines from the terminal.
    pub fn stdin() -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    /// Read lines from any reader. The reader is moved to a background thread which stops at the
    /// end of the input or on the first error.
    pub fn from_reader<R>(mut reader: R) -> Self
    where
        R: BufRead + Send + 'static
    {
        let (tx, rx): (Sender<io::Result<String>>, _) = channel();

        thread::spawn(move || loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                },
                Err(e) => {
                    tx.send(Err(e)).ok();
                    break;
                }
            }
        });

        Self { lines: rx }
    }

    /// Block until the operator presses ENTER or `run_flag` is cleared.
    pub fn wait_for_enter(&self, run_flag: &RunFlag) -> Result<(), CalibError> {
        let poll_period = secs_to_duration(INPUT_POLL_PERIOD_S);

        loop {
            if !run_flag.is_running() {
                return Err(CalibError::Interrupted);
            }

            match self.lines.recv_timeout(poll_period) {
                Ok(Ok(line)) => {
                    debug!("Operator input: {:?}", line.trim_end());
                    return Ok(());
                },
                Ok(Err(e)) => return Err(CalibError::Input(e)),
                Err(RecvTimeoutError::Timeout) => (),
                Err(RecvTimeoutError::Disconnected) => return Err(CalibError::InputClosed)
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Run the operator-assisted zero heading calibration.
///
/// Blocks until a line is read from `input` or `run_flag` is cleared.
pub fn calibrate_zero<T: Toy>(
    toy: &mut T,
    input: &LineInput,
    run_flag: &RunFlag
) -> Result<CalibOutcome, CalibError> {
    info!("Calibration: turn the toy so heading 0 points along the drive line, then press ENTER");

    toy.start_calibration().advisory("start_calibration");

    input.wait_for_enter(run_flag)?;

    let outcome = match toy.finish_calibration() {
        Ok(()) => CalibOutcome::Aimed,
        Err(e) => {
            warn!("Aiming mode unavailable ({}), forcing the current heading to zero", e);
            toy.set_heading(0).map_err(CalibError::Toy)?;
            CalibOutcome::ForcedZero
        }
    };

    info!("Heading zero set");

    Ok(outcome)
}
