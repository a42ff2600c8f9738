//! # Command Line Support
//!
//! Options and start up steps shared by all the binaries.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use color_eyre::{eyre::WrapErr, Result};
use log::info;
use structopt::StructOpt;

use toy_if::{net::NetParams, Scanner, ToyError, ToyInfo};
use util::{
    logger::{logger_init, parse_level, LevelFilter},
    session::Session,
};

use crate::backend::{BridgeScanner, SimParams, SimScanner};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Toy name selecting whichever toy has the strongest signal.
pub const NEAREST: &str = "nearest";

/// Directory, under the software root, holding the session directories.
const SESSIONS_DIR: &str = "sessions";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Options common to every tool.
#[derive(Debug, StructOpt)]
pub struct CommonOpts {
    /// Drive simulated toys instead of going through the SDK bridge
    #[structopt(long)]
    pub sim: bool,

    /// Minimum log level: info, debug or trace
    #[structopt(long, default_value = "info", parse(try_from_str = parse_level))]
    pub log_level: LevelFilter,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create the session and start logging.
pub fn init_session(exec_name: &str, title: &str, opts: &CommonOpts) -> Result<Session> {
    let session = Session::new(exec_name, SESSIONS_DIR)
        .wrap_err("Failed to create the session")?;

    logger_init(opts.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("{}\n", title);
    info!("Session directory: {:?}", session.session_root);
    if opts.sim {
        info!("Using simulated toys");
    }

    Ok(session)
}

/// Scanner for toys reached through the SDK bridge, configured from `bridge.toml`.
pub fn bridge_scanner() -> Result<BridgeScanner> {
    let params: NetParams = util::params::load_or_default("bridge.toml")
        .wrap_err("Could not load the bridge parameters")?;

    info!("SDK bridge endpoint: {}", params.bridge_endpoint);

    Ok(BridgeScanner::new(params))
}

/// Scanner for simulated toys, configured from `sim.toml`.
pub fn sim_scanner() -> Result<SimScanner> {
    let params: SimParams = util::params::load_or_default("sim.toml")
        .wrap_err("Could not load the simulation parameters")?;

    Ok(SimScanner::new(params))
}

/// Find a toy by name or address, or the nearest one if `name` is [`NEAREST`].
pub fn find_toy_info<S: Scanner>(scanner: &S, name: &str) -> Result<ToyInfo, ToyError> {
    let info = if name == NEAREST {
        scanner.find_nearest()?
    }
    else {
        scanner.find_toy(name)?
    };

    info!("Found {}", info.name);

    Ok(info)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::sim::test::fast_params;

    #[test]
    fn test_common_opts() {
        let opts = CommonOpts::from_iter(&["tool", "--sim", "--log-level", "debug"]);
        assert!(opts.sim);
        assert_eq!(opts.log_level, LevelFilter::Debug);

        let opts = CommonOpts::from_iter(&["tool"]);
        assert!(!opts.sim);
        assert_eq!(opts.log_level, LevelFilter::Info);

        assert!(CommonOpts::from_iter_safe(&["tool", "--log-level", "loud"]).is_err());
        assert!(CommonOpts::from_iter_safe(&["tool", "--log-level", "warn"]).is_err());
    }

    #[test]
    fn test_find_nearest_or_named() {
        let scanner = SimScanner::new(fast_params());
        assert_eq!(find_toy_info(&scanner, NEAREST).unwrap().name, "SB-9DD8");
        assert_eq!(find_toy_info(&scanner, "SB-81E0").unwrap().name, "SB-81E0");
        assert!(matches!(find_toy_info(&scanner, "SB-0000"), Err(ToyError::NotFound(_))));
    }
}
