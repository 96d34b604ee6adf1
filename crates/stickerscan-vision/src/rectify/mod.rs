// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marker rectification: find the printed sticker in a camera frame and warp
// it onto the canonical rectangle.

pub mod contour;
pub mod corners;
pub mod filter;

use image::{GrayImage, Rgba, RgbaImage};
use imageproc::contours::find_contours;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::point::Point;
use stickerscan_core::config::DetectionConfig;
use stickerscan_core::error::Result;
use tracing::{debug, info, instrument, warn};

pub use contour::{CandidateFilter, Quad};
pub use corners::{OrderedCorners, landscape_corners, order_corners};

/// Fill for output pixels whose source falls outside the frame.
const BORDER_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Detects the marker in a frame and produces its perspective-corrected image.
///
/// Construction precomputes the filter kernels; a `Rectifier` is then reused
/// for every frame of a session.
///
/// ## Pipeline
///
/// 1. Convert the RGBA frame to grayscale
/// 2. Gaussian blur (`blur_kernel` x `blur_kernel`)
/// 3. Adaptive threshold against a Gaussian-weighted local mean
/// 4. Trace every contour, outer borders and holes alike
/// 5. Drop contours under `min_contour_area`; approximate the rest with
///    Douglas–Peucker and keep 4-vertex results
/// 6. Label each quad's corners TL/TR/BR/BL and keep those whose width over
///    height is near the marker's; the largest wins
/// 7. Warp the frame onto the canonical rectangle (bilinear, constant border)
#[derive(Debug, Clone)]
pub struct Rectifier {
    config: DetectionConfig,
    blur_kernel: Vec<f32>,
    threshold_kernel: Vec<f32>,
}

impl Rectifier {
    /// Validate the parameters and precompute the kernels.
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        let blur_kernel = filter::gaussian_kernel(config.blur_kernel);
        let threshold_kernel = filter::gaussian_kernel(config.threshold_block_size);
        info!(
            canonical_width = config.canonical_width,
            canonical_height = config.canonical_height,
            marker_aspect = config.marker_aspect,
            "Rectifier ready"
        );
        Ok(Self {
            config,
            blur_kernel,
            threshold_kernel,
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Width and height of every rectified image.
    pub fn canonical_size(&self) -> (u32, u32) {
        (self.config.canonical_width, self.config.canonical_height)
    }

    /// Detect the marker and warp it. `None` means no qualifying marker.
    #[instrument(skip_all, fields(width = frame.width(), height = frame.height()))]
    pub fn rectify(&self, frame: &RgbaImage) -> Option<RgbaImage> {
        let corners = self.locate(frame)?;
        self.warp(frame, &corners)
    }

    /// Steps 1–6: find the marker and label its corners.
    pub fn locate(&self, frame: &RgbaImage) -> Option<OrderedCorners> {
        let binary = self.binarize(frame);
        let contours = find_contours::<i32>(&binary);
        drop(binary);
        debug!(contours = contours.len(), "Contours traced");

        let filter = CandidateFilter::from(&self.config);
        let candidates = contours.into_iter().map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(p.x as f64, p.y as f64))
                .collect::<Vec<_>>()
        });

        let Some(quad) = contour::select_marker(candidates, &filter) else {
            debug!("No marker candidate in frame");
            return None;
        };

        let corners = quad.corners();
        debug!(
            area = quad.area,
            top_left = ?corners.top_left,
            top_right = ?corners.top_right,
            bottom_right = ?corners.bottom_right,
            bottom_left = ?corners.bottom_left,
            "Marker located"
        );
        Some(corners)
    }

    /// Steps 1–3: grayscale, blur and adaptive threshold.
    pub fn binarize(&self, frame: &RgbaImage) -> GrayImage {
        let gray = image::imageops::grayscale(frame);
        let blurred = filter::gaussian_blur(&gray, &self.blur_kernel);
        drop(gray);
        filter::adaptive_threshold(&blurred, &self.threshold_kernel, self.config.threshold_offset)
    }

    /// Step 7: map the labelled corners onto the canonical rectangle.
    pub fn warp(&self, frame: &RgbaImage, corners: &OrderedCorners) -> Option<RgbaImage> {
        let (out_w, out_h) = self.canonical_size();
        let dest: [(f32, f32); 4] = [
            (0.0, 0.0),
            (out_w as f32, 0.0),
            (out_w as f32, out_h as f32),
            (0.0, out_h as f32),
        ];

        let Some(projection) = Projection::from_control_points(corners.to_control_points(), dest)
        else {
            warn!("Failed to compute projective transform for marker corners");
            return None;
        };

        let mut output = RgbaImage::new(out_w, out_h);
        warp_into(frame, &projection, Interpolation::Bilinear, BORDER_FILL, &mut output);
        debug!(out_w, out_h, "Marker rectified");
        Some(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;

    fn rectifier() -> Rectifier {
        Rectifier::new(DetectionConfig::default()).expect("default config is valid")
    }

    fn luminance(p: &Rgba<u8>) -> u32 {
        (p.0[0] as u32 + p.0[1] as u32 + p.0[2] as u32) / 3
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = DetectionConfig {
            blur_kernel: 4,
            ..DetectionConfig::default()
        };
        assert!(Rectifier::new(config).is_err());
    }

    #[test]
    fn clean_axis_aligned_marker_is_rectified() {
        let frame = synthetic::marker_frame(480, 360, 20000.0, 1.826, 0.0);
        let out = rectifier().rectify(&frame).expect("marker found");
        assert_eq!(out.dimensions(), (600, 328));

        // The warped interior is the marker's ink.
        let center = out.get_pixel(300, 164);
        assert!(luminance(center) < 100, "center is {center:?}");
    }

    #[test]
    fn rotated_markers_are_rectified() {
        for degrees in [0.0, 15.0, 30.0, 45.0] {
            let frame = synthetic::marker_frame(480, 360, 20000.0, 1.826, degrees);
            let out = rectifier()
                .rectify(&frame)
                .unwrap_or_else(|| panic!("marker at {degrees}° not found"));
            let ratio = out.width() as f64 / out.height() as f64;
            assert!((ratio - 600.0 / 328.0).abs() < 0.01, "{degrees}°: ratio {ratio}");
            let center = out.get_pixel(300, 164);
            assert!(luminance(center) < 100, "{degrees}°: center is {center:?}");
        }
    }

    #[test]
    fn located_corners_match_the_drawn_marker() {
        let frame = synthetic::marker_frame(480, 360, 20000.0, 1.826, 10.0);
        let drawn = synthetic::marker_corners(480, 360, 20000.0, 1.826, 10.0);
        let corners = rectifier().locate(&frame).expect("marker found");
        let found = [
            corners.top_left,
            corners.top_right,
            corners.bottom_right,
            corners.bottom_left,
        ];
        for (f, d) in found.iter().zip(drawn.iter()) {
            let err = ((f.x - d.0).powi(2) + (f.y - d.1).powi(2)).sqrt();
            assert!(err < 4.0, "found {f:?}, drawn {d:?}");
        }
    }

    #[test]
    fn rotated_markers_keep_the_long_side_on_top() {
        for degrees in [0.0, 15.0, 30.0, 45.0, -30.0] {
            let frame = synthetic::marker_frame(480, 360, 20000.0, 1.826, degrees);
            let corners = rectifier()
                .locate(&frame)
                .unwrap_or_else(|| panic!("marker at {degrees}° not found"));
            assert!(corners.width() > corners.height() * 1.5, "{degrees}°: {corners:?}");
        }
    }

    #[test]
    fn marker_on_its_side_is_not_found() {
        for degrees in [90.0, -90.0] {
            let frame = synthetic::marker_frame(480, 360, 20000.0, 1.826, degrees);
            assert!(rectifier().locate(&frame).is_none(), "{degrees}°");
        }
    }

    #[test]
    fn blank_frame_has_no_marker() {
        let frame = synthetic::blank_frame(480, 360);
        assert!(rectifier().rectify(&frame).is_none());
    }

    #[test]
    fn wrong_aspect_marker_is_ignored() {
        let frame = synthetic::marker_frame(480, 360, 20000.0, 3.0, 0.0);
        assert!(rectifier().rectify(&frame).is_none());
    }

    #[test]
    fn speck_below_minimum_area_is_ignored() {
        let frame = synthetic::marker_frame(480, 360, 1500.0, 1.826, 0.0);
        assert!(rectifier().rectify(&frame).is_none());
    }
}
