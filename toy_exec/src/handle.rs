//! # Toy Handle
//!
//! [`ToyHandle`] owns a connected toy for the lifetime of a run. However the run ends, normally,
//! through an error propagated with `?`, or because the loop noticed an interrupt, dropping the
//! handle stops the toy and releases the connection.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::ops::{Deref, DerefMut};
use log::{info, warn};

use toy_if::{Scanner, Toy, ToyError, ToyInfo};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Exclusive owner of a connected toy.
pub struct ToyHandle<T: Toy> {
    toy: T,
    released: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T: Toy> ToyHandle<T> {
    /// Connect to the given toy.
    pub fn acquire<S>(scanner: &S, info: &ToyInfo) -> Result<Self, ToyError>
    where
        S: Scanner<Toy = T>
    {
        let toy = scanner.connect(info)?;
        info!("Connected to {}", toy.name());
        Ok(Self::new(toy))
    }

    /// Take ownership of an already connected toy.
    pub fn new(toy: T) -> Self {
        Self {
            toy,
            released: false,
        }
    }

    /// Stop the toy and disconnect, reporting any failure.
    ///
    /// Both steps are always attempted, the first error is returned.
    pub fn release(mut self) -> Result<(), ToyError> {
        self.released = true;

        let stop = self.toy.stop();
        let disconnect = self.toy.disconnect();

        info!("Released {}", self.toy.name());

        stop.and(disconnect)
    }
}

impl<T: Toy> Deref for ToyHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.toy
    }
}

impl<T: Toy> DerefMut for ToyHandle<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.toy
    }
}

impl<T: Toy> Drop for ToyHandle<T> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(e) = self.toy.stop() {
            warn!("Could not stop {} while releasing it: {}", self.toy.name(), e);
        }
        if let Err(e) = self.toy.disconnect() {
            warn!("Could not disconnect from {}: {}", self.toy.name(), e);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Connect to the toy one more time only to stop it.
///
/// Used after a run has failed, when the original connection may be unusable. Every failure is
/// logged and swallowed.
pub fn reconnect_and_stop<S: Scanner>(scanner: &S, info: &ToyInfo) {
    match ToyHandle::acquire(scanner, info) {
        Ok(handle) => {
            if let Err(e) = handle.release() {
                warn!("Stop after reconnecting to {} failed: {}", info.name, e);
            }
        },
        Err(e) => warn!("Could not reconnect to {} to stop it: {}", info.name, e)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::{sim::test::fast_params, SimCall, SimScanner, SimToy};

    #[test]
    fn test_drop_stops_and_disconnects() {
        let toy = SimToy::new("SB-TEST", fast_params());
        let log = toy.call_log();

        {
            let mut handle = ToyHandle::new(toy);
            handle.set_speed(80).unwrap();
        }

        assert_eq!(
            *log.borrow(),
            vec![SimCall::SetSpeed(80), SimCall::SetSpeed(0), SimCall::Disconnect]
        );
    }

    #[test]
    fn test_drop_on_error_path() {
        fn failing_run(handle: &mut ToyHandle<SimToy>) -> Result<(), ToyError> {
            handle.set_speed(120)?;
            Err(ToyError::Rejected("boom".into()))
        }

        let toy = SimToy::new("SB-TEST", fast_params());
        let log = toy.call_log();

        let result = (|| {
            let mut handle = ToyHandle::new(toy);
            failing_run(&mut handle)
        })();

        assert!(result.is_err());
        assert_eq!(log.borrow().last(), Some(&SimCall::Disconnect));
        assert!(log.borrow().contains(&SimCall::SetSpeed(0)));
    }

    #[test]
    fn test_release_only_once() {
        let toy = SimToy::new("SB-TEST", fast_params());
        let log = toy.call_log();

        ToyHandle::new(toy).release().unwrap();

        assert_eq!(*log.borrow(), vec![SimCall::SetSpeed(0), SimCall::Disconnect]);
    }

    #[test]
    fn test_reconnect_and_stop_swallows_errors() {
        let scanner = SimScanner::new(fast_params());
        reconnect_and_stop(&scanner, &ToyInfo::named("SB-9DD8"));
    }
}
