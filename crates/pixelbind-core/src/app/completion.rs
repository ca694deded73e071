//! Completion channels - 結果の受け渡し
//!
//! A Task carries exactly one channel, and the channel is consumed by its
//! single delivery. Two flavours:
//!
//! - **Handler**: a callback invoked once with `Ok(image)` or `Err(DecodeError)`.
//! - **Future**: a `LoadFuture` the caller awaits.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::domain::{DecodeError, FatalError, Image, TaskId};

/// What a single-image load delivers.
pub type LoadResult = Result<Image, DecodeError>;

/// Error a completion handler may return. It is not recoverable: it goes to
/// the fatal sink.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type LoadHandler = Box<dyn FnOnce(LoadResult) -> Result<(), HandlerError> + Send>;

/// Move-once continuation owned by a Task.
pub enum CompletionChannel {
    Handler(LoadHandler),
    Future(oneshot::Sender<LoadResult>),
}

impl CompletionChannel {
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(LoadResult) -> Result<(), HandlerError> + Send + 'static,
    {
        CompletionChannel::Handler(Box::new(f))
    }

    /// A future-style channel and the future it resolves.
    pub fn future() -> (Self, LoadFuture) {
        let (tx, rx) = oneshot::channel();
        (CompletionChannel::Future(tx), LoadFuture { rx })
    }

    pub fn is_handler(&self) -> bool {
        matches!(self, CompletionChannel::Handler(_))
    }

    /// Hand `result` to the caller.
    ///
    /// A handler that returns an error or panics yields a `FatalError`; the
    /// caller of `deliver` forwards it to the fatal sink. A future whose
    /// receiver is gone is not an error: nobody is waiting.
    pub(crate) fn deliver(self, task_id: TaskId, result: LoadResult) -> Result<(), FatalError> {
        match self {
            CompletionChannel::Handler(handler) => {
                match catch_unwind(AssertUnwindSafe(move || handler(result))) {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(FatalError::HandlerFailed {
                        task_id,
                        message: err.to_string(),
                    }),
                    Err(payload) => Err(FatalError::HandlerPanicked {
                        task_id,
                        message: panic_message(payload.as_ref()),
                    }),
                }
            }
            CompletionChannel::Future(tx) => {
                if tx.send(result).is_err() {
                    log::debug!("{task_id}: future dropped before delivery");
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for CompletionChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionChannel::Handler(_) => f.write_str("CompletionChannel::Handler"),
            CompletionChannel::Future(_) => f.write_str("CompletionChannel::Future"),
        }
    }
}

/// Resolves once the completion loop delivers the Task's result.
///
/// If the completion loop goes away first, resolves to
/// `DecodeError::Abandoned`.
#[derive(Debug)]
pub struct LoadFuture {
    rx: oneshot::Receiver<LoadResult>,
}

impl Future for LoadFuture {
    type Output = LoadResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<LoadResult> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(DecodeError::Abandoned)))
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
