//! WorkerLoop - 1 Task のデコード実行
//!
//! # フロー
//! 1. Semaphore の permit を待つ（Scheduled）
//! 2. spawn_blocking でデコード（Running）
//! 3. 結果を Task に記録（Succeeded / Failed）
//! 4. Task を completion loop に送る
//!
//! Decoder errors and decoder panics are both turned into `DecodeError`
//! here; nothing escapes the worker.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};

use crate::domain::{DecodeError, DecodeMode, ImageSource, TaskState};
use crate::ports::{Clock, Decoder};

use super::completion::{LoadResult, panic_message};
use super::status::StatusBoard;
use super::task::LoadTask;

/// Everything a worker needs, cloned into each spawned Task.
#[derive(Clone)]
pub(crate) struct WorkerLoop {
    pub(crate) decoder: Arc<dyn Decoder>,
    permits: Arc<Semaphore>,
    completions: mpsc::UnboundedSender<LoadTask>,
    clock: Arc<dyn Clock>,
    status: Arc<StatusBoard>,
}

impl WorkerLoop {
    pub(crate) fn new(
        decoder: Arc<dyn Decoder>,
        workers: usize,
        completions: mpsc::UnboundedSender<LoadTask>,
        clock: Arc<dyn Clock>,
        status: Arc<StatusBoard>,
    ) -> Self {
        Self {
            decoder,
            permits: Arc::new(Semaphore::new(workers)),
            completions,
            clock,
            status,
        }
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Drive one Scheduled Task to a terminal state and hand it over.
    pub(crate) async fn run(self, mut task: LoadTask) {
        let permit = Arc::clone(&self.permits).acquire_owned().await;
        if let Err(err) = task.advance(TaskState::Running) {
            log::error!("{err}");
        }
        self.status.started();
        log::debug!("{} running: {} ({})", task.id(), task.source(), task.mode());

        let result = match permit {
            Ok(permit) => {
                let decoder = Arc::clone(&self.decoder);
                let source = task.source().clone();
                let mode = task.mode();
                tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    decode_once(decoder.as_ref(), &source, mode)
                })
                .await
                .unwrap_or_else(|err| Err(DecodeError::Native(format!("decode worker failed: {err}"))))
            }
            Err(_) => Err(DecodeError::Native("worker pool is closed".to_string())),
        };

        let succeeded = result.is_ok();
        match &result {
            Ok(img) => log::debug!("{} decoded {}x{}", task.id(), img.width(), img.height()),
            Err(err) => log::debug!("{} failed: {err}", task.id()),
        }
        if let Err(err) = task.complete(result, self.clock.now()) {
            log::error!("{err}");
        }
        self.status.finished(succeeded);

        if let Err(mpsc::error::SendError(task)) = self.completions.send(task) {
            log::debug!("completion loop is gone; {} will not be delivered", task.id());
        }
    }
}

/// One decode attempt. No retry.
pub(crate) fn decode_once(decoder: &dyn Decoder, source: &ImageSource, mode: DecodeMode) -> LoadResult {
    match catch_unwind(AssertUnwindSafe(|| decoder.decode(source, mode))) {
        Ok(Ok(Some(img))) if !img.is_empty() => Ok(img),
        Ok(Ok(_)) => Err(DecodeError::NotFound),
        Ok(Err(err)) => Err(DecodeError::Native(err.to_string())),
        Err(payload) => Err(DecodeError::Native(panic_message(payload.as_ref()))),
    }
}
