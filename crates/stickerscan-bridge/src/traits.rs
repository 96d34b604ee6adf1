// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic frame capture.

use stickerscan_core::error::Result;
use stickerscan_core::types::PixelBuffer;

/// Grabs the current frame of a video source.
///
/// Implementations keep no per-scan state: every call returns a fresh
/// RGBA8 frame at the source's native resolution, and the caller owns it.
pub trait FrameCapturer: Send + Sync {
    /// Capture the current frame.
    fn capture_frame(&self) -> Result<PixelBuffer>;

    /// Human-readable source name for logs (e.g. "replay (3 frames)").
    fn source_name(&self) -> String;
}

impl<T: FrameCapturer + ?Sized> FrameCapturer for Box<T> {
    fn capture_frame(&self) -> Result<PixelBuffer> {
        (**self).capture_frame()
    }

    fn source_name(&self) -> String {
        (**self).source_name()
    }
}
