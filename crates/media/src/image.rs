//! Derived image generation.

use crate::error::{ErrorKind, Result};
use ::image::codecs::jpeg::JpegEncoder;
use ::image::imageops::FilterType;
use ::image::{DynamicImage, ExtendedColorType, GenericImageView};
use exn::ResultExt;
use std::sync::Arc;

/// A decoded image, shared between the cache and whoever displays it.
pub type DecodedImage = Arc<DynamicImage>;

/// How source artwork is fitted into the target width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fit {
    /// Center-crop to a square first (icons, thumbnails).
    Square,
    /// Keep the whole image and its aspect ratio (posters).
    Full,
}

/// Turns source artwork into derived images and reads them back.
pub trait ImageCodec: Send + Sync {
    /// Produce encoded image bytes exactly `min_width` pixels wide.
    fn resize(&self, source: &[u8], min_width: u32, fit: Fit) -> Result<Vec<u8>>;

    /// Decode previously generated bytes.
    ///
    /// Failure here on a cached file means the file is corrupt.
    fn decode(&self, encoded: &[u8]) -> Result<DecodedImage>;
}

/// [`ImageCodec`] writing baseline RGB JPEG.
#[derive(Clone, Copy, Debug)]
pub struct JpegCodec {
    quality: u8,
}
impl JpegCodec {
    pub const DEFAULT_QUALITY: u8 = 85;

    /// Quality is clamped to `1..=100`.
    pub fn new(quality: u8) -> Self {
        Self { quality: quality.clamp(1, 100) }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}
impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(Self::DEFAULT_QUALITY)
    }
}

impl ImageCodec for JpegCodec {
    #[tracing::instrument(level = "debug", skip(self, source), fields(source_len = source.len()))]
    fn resize(&self, source: &[u8], min_width: u32, fit: Fit) -> Result<Vec<u8>> {
        if min_width == 0 {
            exn::bail!(ErrorKind::InvalidDimensions(min_width));
        }
        let img = ::image::load_from_memory(source).or_raise(|| ErrorKind::Decode)?;
        let (src_w, src_h) = img.dimensions();
        if src_w == 0 || src_h == 0 {
            exn::bail!(ErrorKind::Decode);
        }

        let (cropped, target_h) = match fit {
            Fit::Square => {
                let side = src_w.min(src_h);
                let crop_x = (src_w - side) / 2;
                let crop_y = (src_h - side) / 2;
                (img.crop_imm(crop_x, crop_y, side, side), min_width)
            },
            Fit::Full => {
                let h = (u64::from(src_h) * u64::from(min_width)).div_ceil(u64::from(src_w));
                let h = u32::try_from(h.max(1)).map_err(|_| exn::Exn::from(ErrorKind::InvalidDimensions(min_width)))?;
                (img, h)
            },
        };

        let resized = cropped.resize_exact(min_width, target_h, FilterType::Lanczos3).to_rgb8();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode(resized.as_raw(), resized.width(), resized.height(), ExtendedColorType::Rgb8)
            .or_raise(|| ErrorKind::Encode)?;
        tracing::debug!(src_w, src_h, width = resized.width(), height = resized.height(), "resized artwork");
        Ok(out)
    }

    fn decode(&self, encoded: &[u8]) -> Result<DecodedImage> {
        let img = ::image::load_from_memory(encoded).or_raise(|| ErrorKind::Decode)?;
        Ok(Arc::new(img))
    }
}
