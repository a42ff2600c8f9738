//! # Joystick Drive
//!
//! Drives one toy live from a game controller. The left stick steers relative to the calibrated
//! base heading, the face buttons select the speed preset and the trigger boosts to full speed.
//!
//! Usage: `joy_drive <toy_name> <joystick_index> <player_number>`

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{process, time::Instant};

use color_eyre::{eyre::WrapErr, Result};
use log::{error, info};
use structopt::StructOpt;

use toy_if::Scanner;
use toy_lib::{
    cli::{self, CommonOpts},
    handle::{reconnect_and_stop, ToyHandle},
    interrupt::RunFlag,
    joy_ctrl::{GilrsPad, JoyCtrl, JoyCtrlError},
    params::JoyParams,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "joy_drive", about = "Drive a toy live from a game controller")]
struct Opts {
    /// Name or address of the toy, or "nearest"
    toy_name: String,

    /// Index of the game controller among those connected
    joystick_index: usize,

    /// Player number shown on the toy, 1 to 5
    player: u8,

    #[structopt(flatten)]
    common: CommonOpts,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // Missing arguments print the usage and exit with status 1
    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let _session = cli::init_session("joy_drive", "Joystick Drive", &opts.common)?;

    // ---- LOAD PARAMETERS ----

    let params: JoyParams = util::params::load_or_default("joy_drive.toml")
        .wrap_err("Could not load the joy_drive parameters")?;

    // ---- RUN ----

    let code = if opts.common.sim {
        drive(&cli::sim_scanner()?, params, &opts)?
    }
    else {
        drive(&cli::bridge_scanner()?, params, &opts)?
    };

    if code != 0 {
        process::exit(code);
    }

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Connect and drive, returning the process exit code.
fn drive<S: Scanner>(scanner: &S, params: JoyParams, opts: &Opts) -> Result<i32> {
    let mut ctrl = JoyCtrl::new(params, opts.player, Instant::now())
        .wrap_err("Invalid player number")?;

    let mut pad = GilrsPad::new(opts.joystick_index)
        .wrap_err("Could not open the game controller")?;

    let run_flag = RunFlag::install().wrap_err("Could not install the interrupt handler")?;

    let info = match cli::find_toy_info(scanner, &opts.toy_name) {
        Ok(i) => i,
        Err(e) => {
            error!("{}", e);
            return Ok(1);
        }
    };

    let mut toy = ToyHandle::acquire(scanner, &info)
        .wrap_err_with(|| format!("Could not connect to {}", info.name))?;

    let result = ctrl.run(&mut *toy, &mut pad, &run_flag);

    match result {
        Ok(()) => {
            toy.release().wrap_err("Failed to release the toy")?;
            info!("Bye");
            Ok(0)
        },
        Err(e) => {
            error!("Drive stopped: {}", e);

            // Dropping the handle stops the toy and disconnects
            drop(toy);

            if !matches!(e, JoyCtrlError::BatteryCritical) {
                reconnect_and_stop(scanner, &info);
            }

            Ok(2)
        }
    }
}
