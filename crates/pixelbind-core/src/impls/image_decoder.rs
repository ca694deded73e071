//! ImageCrateDecoder - `image` クレートによる Decoder 実装
//!
//! | Operation | Implementation |
//! |-----------|----------------|
//! | path / buffer | `image::ImageReader` with content sniffing |
//! | animated GIF | `image::codecs::gif::GifDecoder` + `AnimationDecoder` |
//! | APNG | `image::codecs::png::PngDecoder::apng` + `AnimationDecoder` |
//! | animated WebP | `image::codecs::webp::WebPDecoder` + `AnimationDecoder` |
//! | multi-page TIFF | `tiff::decoder::Decoder`, page by page |
//! | other multi | single frame |
//!
//! Sources that can not be opened or whose format can not be recognized
//! yield `Ok(None)`; only genuine decoding failures are errors.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::codecs::png::PngDecoder;
use image::codecs::webp::WebPDecoder;
use image::{AnimationDecoder, DynamicImage, ImageBuffer, ImageFormat, ImageReader};
use tiff::ColorType;
use tiff::decoder::DecodingResult;

use crate::domain::{DecodeMode, Image, ImageSource};
use crate::ports::{Decoder, NativeError};

impl From<image::ImageError> for NativeError {
    fn from(err: image::ImageError) -> Self {
        NativeError::Format(err.to_string())
    }
}

impl From<tiff::TiffError> for NativeError {
    fn from(err: tiff::TiffError) -> Self {
        NativeError::Format(err.to_string())
    }
}

/// Pure Rust decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy)]
pub struct ImageCrateDecoder {
    multi_image: bool,
}

impl ImageCrateDecoder {
    pub fn new() -> Self {
        Self { multi_image: true }
    }

    /// A decoder generation without multi-image support.
    pub fn single_image_only() -> Self {
        Self { multi_image: false }
    }
}

impl Default for ImageCrateDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ImageCrateDecoder {
    fn decode(&self, source: &ImageSource, mode: DecodeMode) -> Result<Option<Image>, NativeError> {
        let decoded = match source {
            ImageSource::Path(path) => {
                let Some(reader) = open_path(path)? else {
                    return Ok(None);
                };
                reader.decode()?
            }
            ImageSource::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Ok(None);
                }
                let reader = ImageReader::new(Cursor::new(&bytes[..])).with_guessed_format()?;
                if reader.format().is_none() {
                    return Ok(None);
                }
                reader.decode()?
            }
        };
        Ok(Some(Image::new(apply_mode(decoded, mode))))
    }

    fn decode_multi(&self, path: &Path) -> Result<Option<Vec<Image>>, NativeError> {
        if !self.multi_image {
            return Err(NativeError::Unsupported);
        }
        let Some(reader) = open_path(path)? else {
            return Ok(None);
        };

        // with_guessed_format rewinds, so the inner reader starts at byte 0.
        let frames = match reader.format() {
            Some(ImageFormat::Gif) => animation_frames(GifDecoder::new(reader.into_inner())?)?,
            Some(ImageFormat::Png) => {
                let png = PngDecoder::new(reader.into_inner())?;
                if png.is_apng()? {
                    animation_frames(png.apng()?)?
                } else {
                    vec![DynamicImage::from_decoder(png)?]
                }
            }
            Some(ImageFormat::WebP) => {
                let webp = WebPDecoder::new(reader.into_inner())?;
                if webp.has_animation() {
                    animation_frames(webp)?
                } else {
                    vec![DynamicImage::from_decoder(webp)?]
                }
            }
            Some(ImageFormat::Tiff) => tiff_pages(reader.into_inner())?,
            _ => vec![reader.decode()?],
        };
        log::trace!("{}: {} frame(s)", path.display(), frames.len());

        let images = frames
            .into_iter()
            .map(|frame| Image::new(apply_mode(frame, DecodeMode::AnyColor)))
            .collect();
        Ok(Some(images))
    }

    fn supports_multi(&self) -> bool {
        self.multi_image
    }
}

fn animation_frames<'a>(decoder: impl AnimationDecoder<'a>) -> Result<Vec<DynamicImage>, NativeError> {
    let frames = decoder.into_frames().collect_frames()?;
    Ok(frames
        .into_iter()
        .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()))
        .collect())
}

/// Every page of a TIFF file, in file order.
fn tiff_pages<R: Read + Seek>(reader: R) -> Result<Vec<DynamicImage>, NativeError> {
    let mut decoder = tiff::decoder::Decoder::new(reader)?;
    let mut pages = vec![tiff_page(&mut decoder)?];
    while decoder.more_images() {
        decoder.next_image()?;
        pages.push(tiff_page(&mut decoder)?);
    }
    Ok(pages)
}

fn tiff_page<R: Read + Seek>(decoder: &mut tiff::decoder::Decoder<R>) -> Result<DynamicImage, NativeError> {
    let (width, height) = decoder.dimensions()?;
    let colortype = decoder.colortype()?;
    let page = match (colortype, decoder.read_image()?) {
        (ColorType::Gray(8), DecodingResult::U8(data)) => {
            ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
        }
        (ColorType::Gray(16), DecodingResult::U16(data)) => {
            ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLuma16)
        }
        (ColorType::GrayA(8), DecodingResult::U8(data)) => {
            ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLumaA8)
        }
        (ColorType::GrayA(16), DecodingResult::U16(data)) => {
            ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageLumaA16)
        }
        (ColorType::RGB(8), DecodingResult::U8(data)) => {
            ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
        }
        (ColorType::RGB(16), DecodingResult::U16(data)) => {
            ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgb16)
        }
        (ColorType::RGBA(8), DecodingResult::U8(data)) => {
            ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgba8)
        }
        (ColorType::RGBA(16), DecodingResult::U16(data)) => {
            ImageBuffer::from_raw(width, height, data).map(DynamicImage::ImageRgba16)
        }
        _ => {
            return Err(NativeError::Format(format!(
                "unsupported TIFF page layout: {colortype:?}"
            )));
        }
    };
    page.ok_or_else(|| {
        NativeError::Format(format!("TIFF page data does not fill {width}x{height}"))
    })
}

/// Open a file and sniff its format. `None` when it can not be opened or
/// the format is unknown.
fn open_path(path: &Path) -> Result<Option<ImageReader<BufReader<File>>>, NativeError> {
    let reader = match ImageReader::open(path) {
        Ok(reader) => reader,
        Err(err) => {
            log::debug!("could not open {}: {err}", path.display());
            return Ok(None);
        }
    };
    let reader = reader.with_guessed_format()?;
    if reader.format().is_none() {
        log::debug!("unrecognized image format: {}", path.display());
        return Ok(None);
    }
    Ok(Some(reader))
}

fn apply_mode(img: DynamicImage, mode: DecodeMode) -> DynamicImage {
    match mode {
        DecodeMode::Unchanged => img,
        DecodeMode::Grayscale => DynamicImage::ImageLuma8(img.to_luma8()),
        DecodeMode::Color => DynamicImage::ImageRgb8(img.to_rgb8()),
        DecodeMode::AnyColor => {
            if img.color().has_color() {
                DynamicImage::ImageRgb8(img.to_rgb8())
            } else {
                DynamicImage::ImageLuma8(img.to_luma8())
            }
        }
    }
}
