//! Domain model (values, images, task identity and state, errors).

pub mod dynamic;
pub mod errors;
pub mod geometry;
pub mod ids;
pub mod image;
pub mod state;

pub use self::dynamic::{DynamicValue, args_from_json};
pub use self::errors::{DecodeError, FatalError, MultiLoadError, ParseError, TransitionError};
pub use self::geometry::{CanonicalValue, Point, Rect, Scalar, Shape, Size, UnknownShape, to_int32};
pub use self::ids::TaskId;
pub use self::image::{DecodeMode, Image, ImageSource, UnknownDecodeMode};
pub use self::state::TaskState;
