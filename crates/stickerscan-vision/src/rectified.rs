// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The image handed on to OCR: either the perspective-corrected marker or, when
// no marker was found, a center-crop of the raw frame at the same aspect.

use image::buffer::ConvertBuffer;
use image::{RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use stickerscan_core::error::{Result, StickerError};
use tracing::debug;

use crate::crop::crop_marks_region;

/// How a [`RectifiedImage`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// The marker was detected and warped onto the canonical rectangle.
    Perspective,
    /// Detection failed on every attempt; the raw frame was center-cropped.
    CenterCrop,
}

/// A canonical-size marker image ready for cropping and upload.
#[derive(Debug, Clone)]
pub struct RectifiedImage {
    image: RgbaImage,
    origin: Origin,
}

impl RectifiedImage {
    pub fn perspective(image: RgbaImage) -> Self {
        Self {
            image,
            origin: Origin::Perspective,
        }
    }

    pub fn center_crop(image: RgbaImage) -> Self {
        Self {
            image,
            origin: Origin::CenterCrop,
        }
    }

    /// Rebuild a warped image from the raw bytes of an engine reply.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let actual = data.len();
        let image = RgbaImage::from_raw(width, height, data).ok_or(StickerError::InvalidFrame {
            width,
            height,
            expected: width as usize * height as usize * 4,
            actual,
        })?;
        Ok(Self::perspective(image))
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// The handwritten digit boxes: the trailing `fraction` of the width.
    pub fn marks_region(&self, fraction: f64) -> RgbaImage {
        crop_marks_region(&self.image, fraction)
    }

    /// Encode as baseline JPEG at the given quality (1–100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        encode_jpeg(&self.image, quality)
    }
}

/// Encode an RGBA image as JPEG, dropping the alpha channel.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(StickerError::ImageError(format!(
            "cannot encode empty {}x{} image",
            image.width(),
            image.height()
        )));
    }
    let mut buffer = Vec::new();
    let rgb: RgbImage = image.convert();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|err| StickerError::ImageError(format!("JPEG encoding failed: {}", err)))?;
    debug!(bytes = buffer.len(), quality, "JPEG encoded");
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn from_raw_rejects_short_payload() {
        let err = RectifiedImage::from_raw(600, 328, vec![0u8; 100]).unwrap_err();
        assert!(matches!(err, StickerError::InvalidFrame { actual: 100, .. }));
    }

    #[test]
    fn from_raw_is_perspective() {
        let data = vec![255u8; 600 * 328 * 4];
        let img = RectifiedImage::from_raw(600, 328, data).expect("valid payload");
        assert_eq!(img.origin(), Origin::Perspective);
        assert_eq!(img.dimensions(), (600, 328));
    }

    #[test]
    fn jpeg_output_has_soi_marker() {
        let img = RectifiedImage::center_crop(RgbaImage::from_pixel(60, 33, Rgba([200, 10, 10, 255])));
        let bytes = img.to_jpeg_bytes(85).expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (60, 33));
    }

    #[test]
    fn empty_image_does_not_encode() {
        assert!(encode_jpeg(&RgbaImage::new(0, 10), 90).is_err());
    }

    #[test]
    fn marks_region_keeps_trailing_share() {
        let img = RectifiedImage::perspective(RgbaImage::new(600, 328));
        let marks = img.marks_region(0.58);
        assert_eq!(marks.dimensions(), (348, 328));
    }
}
