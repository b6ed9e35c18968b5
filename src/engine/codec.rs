// src/engine/codec.rs
//
// The codec seam. Pipeline operations never touch pixels directly; they go
// through the ImageCodec trait, and the default implementation delegates to
// the `image` crate. Swapping in a different backend means implementing four
// methods.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::PipeError;
use crate::ops::{Format, Region};

/// A decoded image travelling through the waterfall.
///
/// The pipeline core only ever reads dimensions and channel count; pixel
/// access stays inside codec implementations.
#[derive(Clone)]
pub struct Image {
    inner: DynamicImage,
    source_format: Option<Format>,
}

impl Image {
    pub fn new(inner: DynamicImage, source_format: Option<Format>) -> Self {
        Self {
            inner,
            source_format,
        }
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

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// The format the image was decoded from, when known.
    pub fn source_format(&self) -> Option<Format> {
        self.source_format
    }

    pub fn dynamic(&self) -> &DynamicImage {
        &self.inner
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.inner
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Image({}x{}, {}ch, {:?})",
            self.width(),
            self.height(),
            self.channels(),
            self.source_format
        )
    }
}

/// Capability interface for pixel work.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<Image, PipeError>;
    fn resize(&self, image: Image, width: u32, height: u32) -> Result<Image, PipeError>;
    fn crop(&self, image: Image, region: Region) -> Result<Image, PipeError>;
    fn encode(&self, image: &Image, format: Format, quality: u8) -> Result<Vec<u8>, PipeError>;
}

/// Reject dimensions that would decompress into an unreasonable buffer.
pub fn check_dimensions(width: u32, height: u32) -> Result<(), PipeError> {
    if width > MAX_DIMENSION {
        return Err(PipeError::DimensionExceedsLimit {
            dimension: width,
            max: MAX_DIMENSION,
        });
    }
    if height > MAX_DIMENSION {
        return Err(PipeError::DimensionExceedsLimit {
            dimension: height,
            max: MAX_DIMENSION,
        });
    }
    let pixels = u64::from(width) * u64::from(height);
    if pixels > MAX_PIXELS {
        return Err(PipeError::PixelCountExceedsLimit {
            pixels,
            max: MAX_PIXELS,
        });
    }
    Ok(())
}

fn from_image_format(format: ImageFormat) -> Option<Format> {
    match format {
        ImageFormat::Jpeg => Some(Format::Jpeg),
        ImageFormat::Png => Some(Format::Png),
        ImageFormat::WebP => Some(Format::WebP),
        ImageFormat::Bmp => Some(Format::Bmp),
        _ => None,
    }
}

fn to_image_format(format: Format) -> ImageFormat {
    match format {
        Format::Jpeg => ImageFormat::Jpeg,
        Format::Png => ImageFormat::Png,
        Format::WebP => ImageFormat::WebP,
        Format::Bmp => ImageFormat::Bmp,
    }
}

/// Default codec backed by the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultCodec;

impl ImageCodec for DefaultCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Image, PipeError> {
        let format = image::guess_format(bytes)
            .map_err(|_| PipeError::unsupported_format("unrecognized magic bytes"))?;
        let source_format = from_image_format(format).ok_or_else(|| {
            PipeError::unsupported_format(format!("{format:?}").to_lowercase())
        })?;

        // Header-only dimension check before committing to a full decode.
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| PipeError::decode_failed(e.to_string()))?;
        check_dimensions(width, height)?;

        let inner = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| PipeError::decode_failed(e.to_string()))?;
        Ok(Image::new(inner, Some(source_format)))
    }

    fn resize(&self, image: Image, width: u32, height: u32) -> Result<Image, PipeError> {
        let (src_w, src_h) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(PipeError::resize_failed(
                (src_w, src_h),
                (width, height),
                "target dimensions must be non-zero",
            ));
        }
        check_dimensions(width, height)?;

        let source_format = image.source_format;
        let resized = image
            .into_dynamic()
            .resize_exact(width, height, FilterType::CatmullRom);
        Ok(Image::new(resized, source_format))
    }

    fn crop(&self, image: Image, region: Region) -> Result<Image, PipeError> {
        let (img_w, img_h) = (image.width(), image.height());
        let x_end = region.x.checked_add(region.width);
        let y_end = region.y.checked_add(region.height);
        let in_bounds = matches!((x_end, y_end), (Some(xe), Some(ye)) if xe <= img_w && ye <= img_h);
        if !in_bounds || region.width == 0 || region.height == 0 {
            return Err(PipeError::InvalidCropBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                img_width: img_w,
                img_height: img_h,
            });
        }

        let source_format = image.source_format;
        let cropped = image
            .dynamic()
            .crop_imm(region.x, region.y, region.width, region.height);
        Ok(Image::new(cropped, source_format))
    }

    fn encode(&self, image: &Image, format: Format, quality: u8) -> Result<Vec<u8>, PipeError> {
        let mut out = Cursor::new(Vec::new());
        match format {
            Format::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = image.dynamic().to_rgb8();
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    &mut out,
                    quality.clamp(1, 100),
                );
                rgb.write_with_encoder(encoder)
                    .map_err(|e| PipeError::encode_failed(format.as_str(), e.to_string()))?;
            }
            Format::Png | Format::WebP | Format::Bmp => {
                image
                    .dynamic()
                    .write_to(&mut out, to_image_format(format))
                    .map_err(|e| PipeError::encode_failed(format.as_str(), e.to_string()))?;
            }
        }
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> Image {
        let inner = DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        }));
        Image::new(inner, Some(Format::Png))
    }

    #[test]
    fn dimension_guard_rejects_oversize() {
        assert!(check_dimensions(100, 100).is_ok());
        assert!(matches!(
            check_dimensions(MAX_DIMENSION + 1, 1),
            Err(PipeError::DimensionExceedsLimit { .. })
        ));
        assert!(matches!(
            check_dimensions(20_000, 20_000),
            Err(PipeError::PixelCountExceedsLimit { .. })
        ));
    }

    #[test]
    fn decode_round_trips_png() {
        let codec = DefaultCodec;
        let bytes = codec.encode(&checker(16, 8), Format::Png, 80).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
        assert_eq!(decoded.source_format(), Some(Format::Png));
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = DefaultCodec.decode(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, PipeError::UnsupportedFormat { .. }));
    }

    #[test]
    fn resize_rejects_zero_target() {
        let err = DefaultCodec.resize(checker(8, 8), 0, 4).unwrap_err();
        assert!(matches!(err, PipeError::ResizeFailed { .. }));
    }

    #[test]
    fn resize_changes_dimensions() {
        let out = DefaultCodec.resize(checker(16, 16), 8, 4).unwrap();
        assert_eq!((out.width(), out.height()), (8, 4));
    }

    #[test]
    fn crop_respects_bounds() {
        let region = Region {
            width: 4,
            height: 4,
            x: 2,
            y: 2,
        };
        let out = DefaultCodec.crop(checker(8, 8), region).unwrap();
        assert_eq!((out.width(), out.height()), (4, 4));

        let bad = Region {
            width: 8,
            height: 8,
            x: 2,
            y: 2,
        };
        assert!(matches!(
            DefaultCodec.crop(checker(8, 8), bad),
            Err(PipeError::InvalidCropBounds { .. })
        ));
    }

    #[test]
    fn jpeg_encode_drops_alpha() {
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([10, 20, 30, 128]),
        ));
        let img = Image::new(rgba, None);
        let bytes = DefaultCodec.encode(&img, Format::Jpeg, 90).unwrap();
        let back = DefaultCodec.decode(&bytes).unwrap();
        assert_eq!(back.channels(), 3);
    }
}
