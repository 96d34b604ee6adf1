// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Replay of still images as camera frames.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::RgbaImage;
use stickerscan_core::error::{Result, StickerError};
use stickerscan_core::types::PixelBuffer;
use tracing::{debug, info};

use crate::traits::FrameCapturer;

/// Serves a fixed sequence of frames, one per capture.
///
/// Once the sequence is exhausted the last frame is served again, the way a
/// camera pointed at a still scene keeps producing the same picture.
#[derive(Debug)]
pub struct ReplayCamera {
    frames: Vec<RgbaImage>,
    cursor: AtomicUsize,
}

impl ReplayCamera {
    /// Replay in-memory images.
    pub fn from_images(frames: Vec<RgbaImage>) -> Result<Self> {
        if frames.is_empty() {
            return Err(StickerError::Capture("replay needs at least one frame".into()));
        }
        Ok(Self {
            frames,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Decode image files (any format `image` understands) and replay them in
    /// the given order.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let frames = paths
            .iter()
            .map(|p| decode(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        info!(frames = frames.len(), "Replay camera loaded");
        Self::from_images(frames)
    }

    /// Number of captures served so far.
    pub fn captures(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn decode(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).map_err(|e| {
        StickerError::Capture(format!("cannot read frame {}: {}", path.display(), e))
    })?;
    Ok(img.to_rgba8())
}

impl FrameCapturer for ReplayCamera {
    fn capture_frame(&self) -> Result<PixelBuffer> {
        let n = self.cursor.fetch_add(1, Ordering::SeqCst);
        let index = n.min(self.frames.len() - 1);
        let frame = &self.frames[index];
        debug!(capture = n + 1, index, "Replaying frame");
        PixelBuffer::new(frame.width(), frame.height(), frame.as_raw().clone())
    }

    fn source_name(&self) -> String {
        format!("replay ({} frames)", self.frames.len())
    }
}
