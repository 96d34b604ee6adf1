// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// stickerscan-vision: Image algorithms for the sticker rectification pipeline.
//
// Locates the printed marker in a camera frame (grayscale, blur, adaptive
// threshold, contours, polygon approximation), orders its corners, warps it
// onto the canonical rectangle, and provides the center-crop fallback and the
// marks-region crop applied before OCR.

pub mod crop;
pub mod frame;
pub mod rectified;
pub mod rectify;

#[cfg(any(test, feature = "test-support"))]
pub mod synthetic;

pub use crop::{center_crop_fallback, crop_marks_region};
pub use rectified::{Origin, RectifiedImage};
pub use rectify::Rectifier;
