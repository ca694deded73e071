//! Image, decode mode and load source.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A decoded image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    inner: DynamicImage,
}

impl Image {
    pub fn new(inner: DynamicImage) -> Self {
        Self { inner }
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn channels(&self) -> u8 {
        self.inner.color().channel_count()
    }

    /// Zero-area images count as "no image".
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.inner
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.inner
    }
}

impl From<DynamicImage> for Image {
    fn from(inner: DynamicImage) -> Self {
        Self::new(inner)
    }
}

/// How decoded pixels are converted before they are handed back.
///
/// Flag values follow the native imread flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Keep channels and depth as stored (`-1`).
    Unchanged,
    /// Single 8-bit channel (`0`).
    Grayscale,
    /// Three 8-bit channels (`1`).
    #[default]
    Color,
    /// Keep gray as gray, everything else three channels (`4`).
    AnyColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown decode mode: {0}")]
pub struct UnknownDecodeMode(pub String);

impl DecodeMode {
    pub fn from_flag(flag: i32) -> Option<Self> {
        match flag {
            -1 => Some(DecodeMode::Unchanged),
            0 => Some(DecodeMode::Grayscale),
            1 => Some(DecodeMode::Color),
            4 => Some(DecodeMode::AnyColor),
            _ => None,
        }
    }

    pub fn flag(self) -> i32 {
        match self {
            DecodeMode::Unchanged => -1,
            DecodeMode::Grayscale => 0,
            DecodeMode::Color => 1,
            DecodeMode::AnyColor => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DecodeMode::Unchanged => "unchanged",
            DecodeMode::Grayscale => "grayscale",
            DecodeMode::Color => "color",
            DecodeMode::AnyColor => "anycolor",
        }
    }
}

impl fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts a mode name or a numeric flag.
impl FromStr for DecodeMode {
    type Err = UnknownDecodeMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unchanged" => Ok(DecodeMode::Unchanged),
            "grayscale" | "gray" => Ok(DecodeMode::Grayscale),
            "color" => Ok(DecodeMode::Color),
            "anycolor" => Ok(DecodeMode::AnyColor),
            other => other
                .parse::<i32>()
                .ok()
                .and_then(DecodeMode::from_flag)
                .ok_or_else(|| UnknownDecodeMode(s.to_string())),
        }
    }
}

/// Where a single-image load reads from.
///
/// Buffers are shared read-only (`Arc<[u8]>`): nobody can mutate them while a
/// Task holds them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Path(path) => write!(f, "path:{}", path.display()),
            ImageSource::Bytes(bytes) => write!(f, "buffer({} bytes)", bytes.len()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes.into())
    }
}

impl From<Arc<[u8]>> for ImageSource {
    fn from(bytes: Arc<[u8]>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};

    #[test]
    fn mode_parses_names_and_flags() {
        assert_eq!("grayscale".parse::<DecodeMode>().unwrap(), DecodeMode::Grayscale);
        assert_eq!("-1".parse::<DecodeMode>().unwrap(), DecodeMode::Unchanged);
        assert_eq!("4".parse::<DecodeMode>().unwrap(), DecodeMode::AnyColor);
        assert!("7".parse::<DecodeMode>().is_err());
        assert!("sepia".parse::<DecodeMode>().is_err());
    }

    #[test]
    fn mode_flags_roundtrip() {
        for mode in [
            DecodeMode::Unchanged,
            DecodeMode::Grayscale,
            DecodeMode::Color,
            DecodeMode::AnyColor,
        ] {
            assert_eq!(DecodeMode::from_flag(mode.flag()), Some(mode));
        }
    }

    #[test]
    fn image_reports_geometry() {
        let img = Image::from(DynamicImage::ImageRgb8(RgbImage::new(4, 3)));
        assert_eq!((img.width(), img.height(), img.channels()), (4, 3, 3));
        assert!(!img.is_empty());

        let empty = Image::from(DynamicImage::ImageLuma8(GrayImage::new(0, 5)));
        assert!(empty.is_empty());
    }

    #[test]
    fn source_display() {
        assert_eq!(ImageSource::from(vec![1, 2, 3]).to_string(), "buffer(3 bytes)");
        assert_eq!(ImageSource::from("a/b.png").to_string(), "path:a/b.png");
    }
}
