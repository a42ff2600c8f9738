//! # Locator Probe
//!
//! Drives one straight pulse from a reset locator and prints the position the toy reports, to be
//! compared with a tape measure.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::process;

use color_eyre::{eyre::WrapErr, Result};
use log::{error, warn};
use structopt::StructOpt;

use toy_if::Scanner;
use toy_lib::{
    cli::{self, CommonOpts},
    handle::ToyHandle,
    path::probe_drive,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "locator_probe", about = "Check the locator against a measured distance")]
struct Opts {
    /// Name or address of the toy, or "nearest"
    #[structopt(long)]
    name: String,

    /// Drive speed as a percentage of the maximum, 10 to 100
    #[structopt(long, default_value = "60")]
    speed: f64,

    /// Length of the drive pulse in seconds
    #[structopt(long, default_value = "2.0")]
    duration: f64,

    #[structopt(flatten)]
    common: CommonOpts,
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    let _session = cli::init_session("locator_probe", "Locator Probe", &opts.common)?;

    let code = if opts.common.sim {
        probe(&cli::sim_scanner()?, &opts)?
    }
    else {
        probe(&cli::bridge_scanner()?, &opts)?
    };

    if code != 0 {
        process::exit(code);
    }

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn probe<S: Scanner>(scanner: &S, opts: &Opts) -> Result<i32> {
    let info = match cli::find_toy_info(scanner, &opts.name) {
        Ok(i) => i,
        Err(e) => {
            error!("{}", e);
            return Ok(1);
        }
    };

    let mut toy = ToyHandle::acquire(scanner, &info)
        .wrap_err_with(|| format!("Could not connect to {}", info.name))?;

    let location = probe_drive(&mut *toy, opts.speed, opts.duration)
        .wrap_err("Probe drive failed")?;

    toy.release().wrap_err("Failed to release the toy")?;

    match location {
        Some(l) => {
            println!(
                "x = {:.1} cm, y = {:.1} cm, distance = {:.1} cm",
                l.x,
                l.y,
                l.distance_from_origin()
            );
            Ok(0)
        },
        None => {
            warn!("The toy did not report a location");
            Ok(2)
        }
    }
}
