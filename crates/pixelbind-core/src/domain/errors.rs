//! Errors - エラー型と分類
//!
//! - `ParseError`: argument shape is wrong. Synchronous, never crosses a Task.
//! - `DecodeError`: a single-image load failed. Delivered through the channel.
//! - `MultiLoadError`: the synchronous multi-image load failed.
//! - `FatalError`: caller code inside a completion handler failed. Goes to the
//!   fatal sink instead of being recovered.
//! - `TransitionError`: a Task state change that the state machine forbids.

use thiserror::Error;

use super::ids::TaskId;
use super::state::TaskState;

/// Wrong argument shape for a value resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Object must have properties {}", field_list(.fields))]
    MissingFields { fields: &'static [&'static str] },

    #[error("Properties {} must be numbers", field_list(.fields))]
    NonNumericFields { fields: &'static [&'static str] },

    #[error("Argument {position} must be an object with properties {expected}")]
    NotAnObject {
        position: usize,
        expected: &'static str,
    },

    #[error("Argument {position} must be a number")]
    NonNumericArgument { position: usize },

    #[error("Array must have {expected} values, found {found}")]
    ArrayArity { expected: usize, found: usize },

    #[error("Array values must be numbers")]
    NonNumericArrayValue,

    #[error("Argument 1 must be either a Scalar or array")]
    NotScalarLike,

    #[error("Unsupported argument: {0}")]
    UnsupportedValue(String),

    #[error("No matching call signature found")]
    NoMatchingSignature,
}

impl ParseError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// `["x", "y"]` -> `"x" and "y"`, `["x", "y", "w"]` -> `"x", "y" and "w"`.
fn field_list(fields: &[&str]) -> String {
    let quoted: Vec<String> = fields.iter().map(|f| format!("\"{f}\"")).collect();
    match quoted.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
    }
}

/// Outcome of a failed single-image load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The decoder raised an error; carries its message.
    #[error("{0}")]
    Native(String),

    /// The decoder ran but produced no usable image.
    #[error("Could not open or find the image")]
    NotFound,

    /// The completion loop went away before this load was delivered.
    #[error("image load was abandoned before completion")]
    Abandoned,
}

/// Outcome of a failed multi-image load.
///
/// "could not open", "opened but empty" and "not supported" are kept apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultiLoadError {
    #[error("multi-image loading is not supported by this decoder")]
    Unsupported,

    #[error("Error loading file")]
    Unreadable,

    #[error("file contains no frames")]
    NoFrames,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Caller code failed inside a completion handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("completion handler for {task_id} returned an error: {message}")]
    HandlerFailed { task_id: TaskId, message: String },

    #[error("completion handler for {task_id} panicked: {message}")]
    HandlerPanicked { task_id: TaskId, message: String },
}

impl FatalError {
    pub fn task_id(&self) -> TaskId {
        match self {
            FatalError::HandlerFailed { task_id, .. } | FatalError::HandlerPanicked { task_id, .. } => {
                *task_id
            }
        }
    }
}

/// A forbidden Task state change. The state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal task transition for {task_id}: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub task_id: TaskId,
    pub from: TaskState,
    pub to: TaskState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_lists_read_naturally() {
        assert_eq!(field_list(&["x", "y"]), "\"x\" and \"y\"");
        assert_eq!(
            field_list(&["x", "y", "width", "height"]),
            "\"x\", \"y\", \"width\" and \"height\""
        );
    }

    #[test]
    fn parse_error_messages() {
        let e = ParseError::MissingFields {
            fields: &["width", "height"],
        };
        assert_eq!(
            e.message(),
            "Object must have properties \"width\" and \"height\""
        );

        let e = ParseError::NonNumericArgument { position: 3 };
        assert_eq!(e.message(), "Argument 3 must be a number");
    }

    #[test]
    fn not_found_has_fixed_message() {
        assert_eq!(
            DecodeError::NotFound.to_string(),
            "Could not open or find the image"
        );
    }

    #[test]
    fn multi_load_wraps_decode_error_transparently() {
        let e = MultiLoadError::from(DecodeError::Native("bad header".into()));
        assert_eq!(e.to_string(), "bad header");
    }
}
