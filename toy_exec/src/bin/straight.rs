//! # Straight Line Timing
//!
//! Rolls a toy straight until Ctrl-C and prints the elapsed time. Dividing the distance covered by
//! this time gives the `--cmps` value for `race`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::process;

use color_eyre::{eyre::WrapErr, Result};
use log::{error, info};
use structopt::StructOpt;

use toy_if::{Advisory, Scanner, Toy};
use toy_lib::{
    calib::{CalibError, LineInput},
    cli::{self, CommonOpts},
    handle::{reconnect_and_stop, ToyHandle},
    interrupt::RunFlag,
    params::StraightParams,
    straight::{run_straight, StraightError, StraightRun, LED_ERR},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "straight", about = "Time a straight line run")]
struct Opts {
    /// Name or address of the toy, or "nearest"
    #[structopt(long)]
    name: String,

    /// Drive speed as a percentage of the maximum, 10 to 100
    #[structopt(long, default_value = "70")]
    speed: f64,

    /// Heading to drive along, in degrees
    #[structopt(long, default_value = "0")]
    heading: u16,

    /// Skip the heading calibration
    #[structopt(long)]
    no_calib: bool,

    #[structopt(flatten)]
    common: CommonOpts,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let _session = cli::init_session("straight", "Straight Line Timing", &opts.common)?;

    // ---- LOAD PARAMETERS ----

    let params: StraightParams = util::params::load_or_default("straight.toml")
        .wrap_err("Could not load the straight parameters")?;

    // ---- RUN ----

    let code = if opts.common.sim {
        straight(&cli::sim_scanner()?, &params, &opts)?
    }
    else {
        straight(&cli::bridge_scanner()?, &params, &opts)?
    };

    if code != 0 {
        process::exit(code);
    }

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Connect and time one run, returning the process exit code.
fn straight<S: Scanner>(scanner: &S, params: &StraightParams, opts: &Opts) -> Result<i32> {
    let run = StraightRun {
        heading_deg: opts.heading,
        speed_pct: opts.speed,
        skip_calibration: opts.no_calib,
    };

    let run_flag = RunFlag::install().wrap_err("Could not install the interrupt handler")?;

    let info = match cli::find_toy_info(scanner, &opts.name) {
        Ok(i) => i,
        Err(e) => {
            error!("{}", e);
            return Ok(1);
        }
    };

    let mut toy = ToyHandle::acquire(scanner, &info)
        .wrap_err_with(|| format!("Could not connect to {}", info.name))?;

    let result = run_straight(&mut *toy, params, &run, &LineInput::stdin(), &run_flag);

    match result {
        Ok(report) => {
            toy.release().wrap_err("Failed to release the toy")?;
            info!(
                "Rolled for {:.3} s ({:.1} s of drive commands)",
                report.elapsed_s,
                report.commanded_s
            );
            println!("{:.3}", report.elapsed_s);
            Ok(0)
        },
        Err(StraightError::CalibError(CalibError::Interrupted)) => {
            toy.release().wrap_err("Failed to release the toy")?;
            println!("STOPPED");
            Ok(0)
        },
        Err(e) => {
            error!("Run failed: {}", e);

            toy.stop().advisory("stop");
            toy.set_main_led(LED_ERR).advisory("error LED");
            drop(toy);

            reconnect_and_stop(scanner, &info);

            Ok(2)
        }
    }
}
