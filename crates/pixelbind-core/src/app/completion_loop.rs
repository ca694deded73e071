//! CompletionLoop - 所有コンテキストでの結果配送
//!
//! Workers send finished Tasks here. The loop runs wherever the caller
//! awaits it, so every handler runs on the owning context, after its
//! decode finished.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::TaskState;
use crate::ports::FatalSink;

use super::status::StatusBoard;
use super::task::{LoadTask, TaskReport};

/// Totals for one `run()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub delivered: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct CompletionLoop {
    rx: mpsc::UnboundedReceiver<LoadTask>,
    fatal: Arc<dyn FatalSink>,
    status: Arc<StatusBoard>,
}

impl CompletionLoop {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<LoadTask>,
        fatal: Arc<dyn FatalSink>,
        status: Arc<StatusBoard>,
    ) -> Self {
        Self { rx, fatal, status }
    }

    /// Wait for the next finished Task and deliver it.
    ///
    /// Returns `None` once the loader and every in-flight Task are gone.
    pub async fn dispatch_next(&mut self) -> Option<TaskReport> {
        let mut task = self.rx.recv().await?;
        let report = task.report();

        if let Some((channel, result)) = task.take_delivery() {
            if let Err(fatal) = channel.deliver(task.id(), result) {
                self.fatal.report(fatal);
            }
            self.status.delivered();
            log::debug!("{} delivered ({:?})", report.id, report.state);
        } else {
            log::warn!("{} reached the completion loop undeliverable", report.id);
        }

        Some(report)
    }

    /// Deliver until the loader is dropped and all its Tasks are delivered.
    pub async fn run(mut self) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        while let Some(report) = self.dispatch_next().await {
            summary.delivered += 1;
            match report.state {
                TaskState::Succeeded => summary.succeeded += 1,
                TaskState::Failed => summary.failed += 1,
                _ => {}
            }
        }
        log::info!(
            "completion loop finished: {} delivered ({} ok, {} failed)",
            summary.delivered,
            summary.succeeded,
            summary.failed
        );
        summary
    }
}
