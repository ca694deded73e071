//! FatalSink implementations.

use std::sync::{Mutex, PoisonError};

use crate::domain::FatalError;
use crate::ports::FatalSink;

/// Logs the error and aborts the process.
///
/// This is the default sink: a failing completion handler is a bug in the
/// caller and the process must not carry on as if nothing happened.
#[derive(Debug, Default)]
pub struct AbortingFatalSink;

impl FatalSink for AbortingFatalSink {
    fn report(&self, error: FatalError) {
        log::error!("fatal: {error}");
        eprintln!("fatal: {error}");
        std::process::abort();
    }
}

/// Keeps every reported error. For embedders that surface fatal errors
/// through their own channel, and for tests.
#[derive(Debug, Default)]
pub struct CollectingFatalSink {
    errors: Mutex<Vec<FatalError>>,
}

impl CollectingFatalSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<FatalError> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FatalSink for CollectingFatalSink {
    fn report(&self, error: FatalError) {
        log::error!("fatal: {error}");
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }
}
