//! Status - ロード状況の集計

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Snapshot of the loader's task counts.
///
/// `scheduled` and `running` are current gauges; the rest are cumulative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadCounts {
    pub scheduled: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub delivered: usize,
}

/// Shared between the loader, its workers and the completion loop.
#[derive(Debug, Default)]
pub(crate) struct StatusBoard {
    counts: Mutex<LoadCounts>,
}

impl StatusBoard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LoadCounts> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn scheduled(&self) {
        self.lock().scheduled += 1;
    }

    pub(crate) fn started(&self) {
        let mut counts = self.lock();
        counts.scheduled = counts.scheduled.saturating_sub(1);
        counts.running += 1;
    }

    pub(crate) fn finished(&self, succeeded: bool) {
        let mut counts = self.lock();
        counts.running = counts.running.saturating_sub(1);
        if succeeded {
            counts.succeeded += 1;
        } else {
            counts.failed += 1;
        }
    }

    pub(crate) fn delivered(&self) {
        self.lock().delivered += 1;
    }

    pub(crate) fn snapshot(&self) -> LoadCounts {
        *self.lock()
    }
}
