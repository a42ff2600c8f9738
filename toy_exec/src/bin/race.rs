//! # Race
//!
//! Replays a fixed path of heading/distance segments. The toy's locator is used to decide when
//! each segment is complete if it works, otherwise each segment is driven for a time estimated
//! from the measured speed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::process;

use color_eyre::{eyre::WrapErr, Result};
use log::{error, info, warn};
use structopt::StructOpt;

use toy_if::{Scanner, Toy};
use toy_lib::{
    calib,
    cli::{self, CommonOpts},
    handle::{reconnect_and_stop, ToyHandle},
    interrupt::RunFlag,
    params::RaceParams,
    path::{select_strategy, LapReport, Path, ReplayError, Replayer},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "race", about = "Replay a fixed path of segments")]
struct Opts {
    /// Name or address of the toy, or "nearest"
    #[structopt(long)]
    name: String,

    /// Drive speed as a percentage of the maximum, 10 to 100
    #[structopt(long)]
    speed: Option<f64>,

    /// Distance covered per second at the drive speed, as measured with `straight`
    #[structopt(long)]
    cmps: Option<f64>,

    /// Comma separated segment lengths in centimeters
    #[structopt(long)]
    segments: Option<String>,

    /// Comma separated segment headings in degrees
    #[structopt(long)]
    headings: Option<String>,

    /// Number of laps
    #[structopt(long, default_value = "1")]
    laps: u32,

    /// Always drive segments by time, even if the locator works
    #[structopt(long)]
    timed: bool,

    /// Skip the heading calibration
    #[structopt(long)]
    no_calib: bool,

    #[structopt(flatten)]
    common: CommonOpts,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
enum RaceError {
    #[error("Calibration failed: {0}")]
    Calib(#[from] calib::CalibError),

    #[error("{0}")]
    Replay(#[from] ReplayError),
}

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let _session = cli::init_session("race", "Race", &opts.common)?;

    // ---- LOAD PARAMETERS ----

    let params: RaceParams = util::params::load_or_default("race.toml")
        .wrap_err("Could not load the race parameters")?;

    // ---- BUILD PATH ----

    // The path is checked before any connection is made
    let segments_csv = opts.segments.clone().unwrap_or_else(|| join(&params.segments_cm));
    let headings_csv = opts.headings.clone().unwrap_or_else(|| join(&params.headings_deg));

    let path = match Path::parse(&segments_csv, &headings_csv) {
        Ok(p) => p,
        Err(e) => {
            error!("Invalid path: {}", e);
            process::exit(2);
        }
    };

    info!("Path: {} segments, {:.0} cm", path.len(), path.total_distance_cm());

    // ---- RUN ----

    let code = if opts.common.sim {
        race(&cli::sim_scanner()?, &params, &path, &opts)?
    }
    else {
        race(&cli::bridge_scanner()?, &params, &path, &opts)?
    };

    if code != 0 {
        process::exit(code);
    }

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Connect and replay the path, returning the process exit code.
fn race<S: Scanner>(scanner: &S, params: &RaceParams, path: &Path, opts: &Opts) -> Result<i32> {
    let speed_pct = opts.speed.unwrap_or(params.speed_pct);
    let cmps = opts.cmps.unwrap_or(params.cmps);

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

    match replay(&mut *toy, params, path, opts, speed_pct, cmps, run_flag) {
        Ok(laps) => {
            toy.release().wrap_err("Failed to release the toy")?;
            print_summary(&laps);
            Ok(0)
        },
        Err(RaceError::Replay(ReplayError::Interrupted))
        | Err(RaceError::Calib(calib::CalibError::Interrupted)) => {
            drop(toy);
            println!("STOPPED");
            Ok(0)
        },
        Err(e) => {
            error!("Race failed: {}", e);
            drop(toy);
            reconnect_and_stop(scanner, &info);
            Ok(2)
        }
    }
}

fn replay<T: Toy>(
    toy: &mut T,
    params: &RaceParams,
    path: &Path,
    opts: &Opts,
    speed_pct: f64,
    cmps: f64,
    run_flag: RunFlag
) -> Result<Vec<LapReport>, RaceError> {
    if opts.no_calib {
        if let Some(first) = path.segments().first() {
            toy.set_heading(first.heading_deg).map_err(ReplayError::from)?;
        }
    }
    else {
        calib::calibrate_zero(toy, &calib::LineInput::stdin(), &run_flag)?;
    }

    let strategy = select_strategy(toy, opts.timed);

    let replayer = Replayer::new(params.replay, strategy, speed_pct, cmps, run_flag);

    Ok(replayer.run_laps(toy, path, opts.laps)?)
}

fn print_summary(laps: &[LapReport]) {
    for lap in laps {
        let shortfalls = lap.segments.iter().filter(|s| s.end.is_shortfall()).count();
        if shortfalls > 0 {
            warn!("Lap {}: {} segments ended early", lap.lap, shortfalls);
        }
        println!("Lap {}: {:.3} s", lap.lap, lap.lap_time_s);
    }
}

fn join<T: ToString>(values: &[T]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}
