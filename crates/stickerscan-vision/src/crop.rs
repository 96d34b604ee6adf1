// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crops applied after rectification.
//
// The marker is laid out left to right: QR identity code (~42% of the width),
// then the handwritten digit boxes (~58%). Only the digit boxes go to OCR.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::{debug, warn};

/// Keep the trailing `marks_fraction` of the image width.
///
/// Never fails: a non-finite or out-of-range fraction is clamped to [0, 1]
/// and a degenerate input yields a zero-width image rather than panicking.
pub fn crop_marks_region(image: &RgbaImage, marks_fraction: f64) -> RgbaImage {
    let (width, height) = image.dimensions();
    let fraction = if marks_fraction.is_finite() {
        marks_fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let keep = ((width as f64 * fraction).round() as u32).min(width);
    let x0 = width - keep;
    debug!(width, height, x0, keep, "Cropping marks region");

    imageops::crop_imm(image, x0, 0, keep, height).to_image()
}

/// Center-crop a raw frame to the canonical aspect and scale it to
/// `out_width` x `out_height`.
///
/// Used when every detection attempt missed: the user still gets an image at
/// the canonical size, just without perspective correction. `fill` is the
/// share of the frame the crop spans along whichever axis limits it.
pub fn center_crop_fallback(
    frame: &RgbaImage,
    out_width: u32,
    out_height: u32,
    fill: f64,
) -> RgbaImage {
    let (frame_w, frame_h) = frame.dimensions();
    if frame_w == 0 || frame_h == 0 || out_width == 0 || out_height == 0 {
        warn!(frame_w, frame_h, "Empty frame; fallback crop is blank");
        return RgbaImage::new(out_width, out_height);
    }

    let fill = if fill.is_finite() { fill.clamp(0.01, 1.0) } else { 1.0 };
    let aspect = out_width as f64 / out_height as f64;

    let mut crop_w = frame_w as f64 * fill;
    let mut crop_h = crop_w / aspect;
    if crop_h > frame_h as f64 * fill {
        crop_h = frame_h as f64 * fill;
        crop_w = crop_h * aspect;
    }
    let crop_w = (crop_w.round() as u32).clamp(1, frame_w);
    let crop_h = (crop_h.round() as u32).clamp(1, frame_h);
    let x0 = (frame_w - crop_w) / 2;
    let y0 = (frame_h - crop_h) / 2;

    debug!(x0, y0, crop_w, crop_h, "Center-crop fallback");
    let cropped = imageops::crop_imm(frame, x0, y0, crop_w, crop_h).to_image();
    imageops::resize(&cropped, out_width, out_height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn marks_crop_discards_identity_side() {
        let mut img = RgbaImage::from_pixel(100, 10, Rgba([0, 0, 0, 255]));
        // Paint the trailing 58 columns white.
        for y in 0..10 {
            for x in 42..100 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let marks = crop_marks_region(&img, 0.58);
        assert_eq!(marks.dimensions(), (58, 10));
        assert!(marks.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn marks_crop_clamps_bad_fractions() {
        let img = RgbaImage::new(50, 20);
        assert_eq!(crop_marks_region(&img, 2.0).dimensions(), (50, 20));
        assert_eq!(crop_marks_region(&img, -1.0).dimensions(), (0, 20));
        assert_eq!(crop_marks_region(&img, f64::NAN).dimensions(), (0, 20));
    }

    #[test]
    fn marks_crop_of_empty_image_is_empty() {
        let img = RgbaImage::new(0, 0);
        assert_eq!(crop_marks_region(&img, 0.58).dimensions(), (0, 0));
    }

    #[test]
    fn fallback_has_canonical_size() {
        let frame = RgbaImage::from_pixel(640, 480, Rgba([90, 90, 90, 255]));
        let out = center_crop_fallback(&frame, 600, 328, 0.8);
        assert_eq!(out.dimensions(), (600, 328));
    }

    #[test]
    fn fallback_is_taken_from_the_center() {
        // Dark frame with a bright block in the middle: the crop must land on it.
        let mut frame = RgbaImage::from_pixel(800, 800, Rgba([0, 0, 0, 255]));
        for y in 200..600 {
            for x in 100..700 {
                frame.put_pixel(x, y, Rgba([250, 250, 250, 255]));
            }
        }
        let out = center_crop_fallback(&frame, 600, 328, 0.5);
        assert!(out.pixels().all(|p| p.0[0] > 200));
    }

    #[test]
    fn fallback_of_empty_frame_is_blank() {
        let out = center_crop_fallback(&RgbaImage::new(0, 0), 600, 328, 0.8);
        assert_eq!(out.dimensions(), (600, 328));
    }
}
