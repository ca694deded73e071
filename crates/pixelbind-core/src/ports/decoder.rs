//! Decoder port - 画像デコードの抽象化
//!
//! The decode algorithm itself is an opaque collaborator. The framework only
//! needs to tell three outcomes apart: an image, "ran fine but produced
//! nothing", and a native error.

use std::path::Path;

use thiserror::Error;

use crate::domain::{DecodeMode, Image, ImageSource};

/// Error raised by a decoder implementation.
#[derive(Debug, Error)]
pub enum NativeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Format(String),

    #[error("multi-image decoding is not supported by this decoder")]
    Unsupported,
}

/// Decoder は bytes / path から画像を作る
///
/// # Contract
/// - `Ok(None)`: the source could not be opened or held no recognizable
///   image. No error is raised for this case.
/// - `Err(_)`: the decoder itself failed.
/// - Implementations may block; they are only ever called from a worker or
///   from the synchronous multi-image path.
///
/// # Thread Safety
/// - `Send + Sync`: shared by every worker through an `Arc`.
pub trait Decoder: Send + Sync {
    fn decode(&self, source: &ImageSource, mode: DecodeMode) -> Result<Option<Image>, NativeError>;

    /// Every frame of a multi-frame file, in order.
    ///
    /// Only called when `supports_multi()` is true.
    fn decode_multi(&self, path: &Path) -> Result<Option<Vec<Image>>, NativeError> {
        let _ = path;
        Err(NativeError::Unsupported)
    }

    /// Decoder generations without multi-image support report `false`.
    fn supports_multi(&self) -> bool {
        false
    }
}
