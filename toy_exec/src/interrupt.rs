//! # Interrupt handling
//!
//! Ctrl-C clears a shared [`RunFlag`]. Control loops poll the flag between pulses and wind down
//! normally, so the toy handle still stops and releases the toy.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::info;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shared flag which is true until the run should end.
#[derive(Clone, Debug)]
pub struct RunFlag(Arc<AtomicBool>);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RunFlag {
    /// Create a flag which nothing but [`RunFlag::stop`] will clear.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Create a flag cleared by Ctrl-C.
    ///
    /// Only one handler can be installed per process.
    pub fn install() -> Result<Self, ctrlc::Error> {
        let flag = Self::new();
        let handler_flag = flag.clone();

        ctrlc::set_handler(move || {
            info!("Interrupt received");
            handler_flag.stop();
        })?;

        Ok(flag)
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = RunFlag::new();
        let other = flag.clone();
        assert!(other.is_running());

        flag.stop();
        assert!(!other.is_running());
    }
}
