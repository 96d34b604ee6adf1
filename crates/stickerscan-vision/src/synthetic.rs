// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic camera frames for tests and benchmarks.

use image::{Rgba, RgbaImage};
use stickerscan_core::types::PixelBuffer;

pub const BACKGROUND: Rgba<u8> = Rgba([220, 220, 220, 255]);
pub const INK: Rgba<u8> = Rgba([40, 40, 40, 255]);

/// Corners (TL, TR, BR, BL before rotation) of a `area`-pixel rectangle with
/// long/short ratio `aspect`, centred in the frame and rotated by `degrees`.
pub fn marker_corners(
    frame_width: u32,
    frame_height: u32,
    area: f64,
    aspect: f64,
    degrees: f64,
) -> [(f64, f64); 4] {
    let half_w = (area * aspect).sqrt() / 2.0;
    let half_h = (area / aspect).sqrt() / 2.0;
    let cx = frame_width as f64 / 2.0;
    let cy = frame_height as f64 / 2.0;
    let (s, c) = degrees.to_radians().sin_cos();
    [
        (-half_w, -half_h),
        (half_w, -half_h),
        (half_w, half_h),
        (-half_w, half_h),
    ]
    .map(|(x, y)| (cx + x * c - y * s, cy + x * s + y * c))
}

/// A light frame with one dark, solid, rotated rectangle at its centre.
pub fn marker_frame(
    frame_width: u32,
    frame_height: u32,
    area: f64,
    aspect: f64,
    degrees: f64,
) -> RgbaImage {
    let mut frame = blank_frame(frame_width, frame_height);
    let quad = marker_corners(frame_width, frame_height, area, aspect, degrees);
    fill_convex(&mut frame, &quad, INK);
    frame
}

/// A uniform light frame.
pub fn blank_frame(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, BACKGROUND)
}

/// `marker_frame` as a raw capture buffer.
pub fn marker_buffer(width: u32, height: u32, degrees: f64) -> PixelBuffer {
    let frame = marker_frame(width, height, 20000.0, 42.0 / 23.0, degrees);
    PixelBuffer::from_raw_unchecked(width, height, frame.into_raw())
}

/// Paint every pixel whose centre lies inside the convex polygon `quad`.
fn fill_convex(image: &mut RgbaImage, quad: &[(f64, f64); 4], color: Rgba<u8>) {
    let xs = quad.iter().map(|p| p.0);
    let ys = quad.iter().map(|p| p.1);
    let min_x = xs.clone().fold(f64::INFINITY, f64::min).floor().max(0.0) as u32;
    let max_x = xs.fold(f64::NEG_INFINITY, f64::max).ceil() as u32;
    let min_y = ys.clone().fold(f64::INFINITY, f64::min).floor().max(0.0) as u32;
    let max_y = ys.fold(f64::NEG_INFINITY, f64::max).ceil() as u32;

    for y in min_y..=max_y.min(image.height().saturating_sub(1)) {
        for x in min_x..=max_x.min(image.width().saturating_sub(1)) {
            if inside_convex(quad, x as f64 + 0.5, y as f64 + 0.5) {
                image.put_pixel(x, y, color);
            }
        }
    }
}

fn inside_convex(quad: &[(f64, f64); 4], px: f64, py: f64) -> bool {
    let mut sign = 0.0;
    for i in 0..4 {
        let (ax, ay) = quad[i];
        let (bx, by) = quad[(i + 1) % 4];
        let cross = (bx - ax) * (py - ay) - (by - ay) * (px - ax);
        if cross != 0.0 {
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_covers_roughly_its_area() {
        let frame = marker_frame(480, 360, 20000.0, 1.826, 30.0);
        let ink = frame.pixels().filter(|p| **p == INK).count() as f64;
        assert!((ink - 20000.0).abs() < 600.0, "ink pixels {ink}");
    }

    #[test]
    fn buffer_is_well_formed() {
        let buffer = marker_buffer(320, 240, 0.0);
        assert!(buffer.is_well_formed());
        assert_eq!(buffer.dimensions(), (320, 240));
    }
}
