//! Host platform utility functions

use std::env;
use std::path::PathBuf;

/// Environment variable pointing at the root of the software tree (the directory holding
/// `params/` and `sessions/`).
pub const SW_ROOT_VAR: &str = "SPHERO_SW_ROOT";

/// Get the root directory of the software tree.
///
/// Uses `SPHERO_SW_ROOT` if set, otherwise falls back to the current working directory so the
/// tools can be run straight from a checkout.
pub fn get_sw_root() -> std::io::Result<PathBuf> {
    match env::var_os(SW_ROOT_VAR) {
        Some(root) => Ok(PathBuf::from(root)),
        None => env::current_dir()
    }
}
