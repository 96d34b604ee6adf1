// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversions between protocol pixel buffers and `image` buffers. Both
// directions move the underlying bytes; nothing is copied.

use image::RgbaImage;
use stickerscan_core::error::{Result, StickerError};
use stickerscan_core::types::PixelBuffer;

/// Reinterpret a pixel buffer as an RGBA image, taking ownership of its bytes.
pub fn frame_to_image(frame: PixelBuffer) -> Result<RgbaImage> {
    let (width, height) = frame.dimensions();
    let expected = PixelBuffer::expected_len(width, height);
    let data = frame.into_bytes();
    let actual = data.len();
    RgbaImage::from_raw(width, height, data).ok_or(StickerError::InvalidFrame {
        width,
        height,
        expected,
        actual,
    })
}

/// Turn an RGBA image into a pixel buffer, taking ownership of its bytes.
pub fn image_to_frame(image: RgbaImage) -> PixelBuffer {
    let (width, height) = image.dimensions();
    PixelBuffer::from_raw_unchecked(width, height, image.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn image_and_frame_convert_both_ways() {
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let frame = image_to_frame(img.clone());
        assert!(frame.is_well_formed());
        assert_eq!(frame.dimensions(), (3, 2));

        let back = frame_to_image(frame).expect("well-formed frame");
        assert_eq!(back, img);
    }

    #[test]
    fn short_frame_is_rejected() {
        let frame = PixelBuffer::from_raw_unchecked(4, 4, vec![0u8; 10]);
        let err = frame_to_image(frame).unwrap_err();
        assert!(matches!(
            err,
            StickerError::InvalidFrame {
                expected: 64,
                actual: 10,
                ..
            }
        ));
    }
}
