//! LoadTask - 1 回分の画像ロード
//!
//! Owns its source, its completion channel and, once decoded, its result.
//! Ownership moves caller -> loader -> worker -> completion loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DecodeMode, ImageSource, TaskId, TaskState, TransitionError};

use super::completion::{CompletionChannel, LoadResult};

#[derive(Debug)]
pub struct LoadTask {
    id: TaskId,
    source: ImageSource,
    mode: DecodeMode,
    state: TaskState,
    result: Option<LoadResult>,
    channel: Option<CompletionChannel>,
    created_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

/// What the completion loop reports after delivering a Task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub id: TaskId,
    pub state: TaskState,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl LoadTask {
    pub(crate) fn new(
        id: TaskId,
        source: ImageSource,
        mode: DecodeMode,
        channel: CompletionChannel,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            source,
            mode,
            state: TaskState::Created,
            result: None,
            channel: Some(channel),
            created_at,
            finished_at: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Move to `to`. Illegal moves leave the Task untouched.
    pub(crate) fn advance(&mut self, to: TaskState) -> Result<(), TransitionError> {
        if !self.state.can_advance_to(to) {
            return Err(TransitionError {
                task_id: self.id,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Record the decode outcome: Running -> Succeeded / Failed.
    pub(crate) fn complete(
        &mut self,
        result: LoadResult,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        let to = if result.is_ok() {
            TaskState::Succeeded
        } else {
            TaskState::Failed
        };
        self.advance(to)?;
        self.result = Some(result);
        self.finished_at = Some(at);
        Ok(())
    }

    pub fn report(&self) -> TaskReport {
        TaskReport {
            id: self.id,
            state: self.state,
            error: match &self.result {
                Some(Err(err)) => Some(err.to_string()),
                _ => None,
            },
            created_at: self.created_at,
            finished_at: self.finished_at,
        }
    }

    /// Take the channel and the result for delivery.
    ///
    /// `None` unless the Task is terminal and has not been delivered yet, so
    /// a Task can be delivered at most once.
    pub(crate) fn take_delivery(&mut self) -> Option<(CompletionChannel, LoadResult)> {
        if !self.state.is_terminal() {
            return None;
        }
        let result = self.result.take()?;
        match self.channel.take() {
            Some(channel) => Some((channel, result)),
            None => {
                self.result = Some(result);
                None
            }
        }
    }
}

impl Drop for LoadTask {
    fn drop(&mut self) {
        match &self.channel {
            Some(channel) if channel.is_handler() => {
                log::warn!("{} dropped before delivery; its handler will not run", self.id);
            }
            Some(_) => log::debug!("{} dropped before delivery", self.id),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DecodeError, Image};
    use chrono::TimeZone;
    use image::{DynamicImage, GrayImage};
    use ulid::Ulid;

    fn at(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap()
    }

    fn new_task() -> LoadTask {
        LoadTask::new(
            TaskId::from(Ulid::from_parts(7, 7)),
            ImageSource::from("a.png"),
            DecodeMode::Color,
            CompletionChannel::handler(|_| Ok(())),
            at(0),
        )
    }

    #[test]
    fn illegal_transition_is_rejected_and_not_applied() {
        let mut task = new_task();
        let err = task.advance(TaskState::Running).unwrap_err();
        assert_eq!(err.from, TaskState::Created);
        assert_eq!(err.to, TaskState::Running);
        assert_eq!(task.state(), TaskState::Created);
    }

    #[test]
    fn completed_task_reports_and_delivers_once() {
        let mut task = new_task();
        task.advance(TaskState::Scheduled).unwrap();
        task.advance(TaskState::Running).unwrap();
        task.complete(Err(DecodeError::NotFound), at(3)).unwrap();

        let report = task.report();
        assert_eq!(report.state, TaskState::Failed);
        assert_eq!(report.error.as_deref(), Some("Could not open or find the image"));
        assert_eq!(report.finished_at, Some(at(3)));

        assert!(task.take_delivery().is_some());
        assert!(task.take_delivery().is_none());
    }

    #[test]
    fn terminal_state_can_not_be_left() {
        let mut task = new_task();
        task.advance(TaskState::Scheduled).unwrap();
        task.advance(TaskState::Running).unwrap();
        let img = Image::new(DynamicImage::ImageLuma8(GrayImage::new(1, 1)));
        task.complete(Ok(img), at(1)).unwrap();

        assert!(task.complete(Err(DecodeError::NotFound), at(2)).is_err());
        assert_eq!(task.state(), TaskState::Succeeded);
        assert!(task.report().error.is_none());
    }

    #[test]
    fn running_task_is_not_deliverable() {
        let mut task = new_task();
        task.advance(TaskState::Scheduled).unwrap();
        task.advance(TaskState::Running).unwrap();
        assert!(task.take_delivery().is_none());
    }
}
