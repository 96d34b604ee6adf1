// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub camera for desktop/CI builds where no native camera API is available.

use stickerscan_core::error::{Result, StickerError};
use stickerscan_core::types::PixelBuffer;

use crate::traits::FrameCapturer;

/// Camera that never produces a frame.
pub struct StubCamera;

impl FrameCapturer for StubCamera {
    fn capture_frame(&self) -> Result<PixelBuffer> {
        tracing::warn!("FrameCapturer::capture_frame called on stub camera");
        Err(StickerError::PlatformUnavailable)
    }

    fn source_name(&self) -> String {
        "Desktop (stub)".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_reports_platform_unavailable() {
        let err = StubCamera.capture_frame().unwrap_err();
        assert!(matches!(err, StickerError::PlatformUnavailable));
    }
}
