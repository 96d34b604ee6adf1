// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Burst retry. One scan event becomes a short series of detection attempts.

use stickerscan_bridge::FrameCapturer;
use stickerscan_core::config::{BurstConfig, CropConfig, ScanConfig};
use stickerscan_core::error::Result;
use stickerscan_vision::frame::frame_to_image;
use stickerscan_vision::{RectifiedImage, center_crop_fallback};
use tracing::{debug, info, instrument, warn};

use crate::dispatcher::Dispatcher;

/// What a burst produced.
#[derive(Debug)]
pub struct BurstOutcome {
    pub image: RectifiedImage,
    /// Detection attempts made (the fallback capture is not counted).
    pub attempts: u32,
}

/// Decides what to do with per-attempt results.
///
/// A failed attempt, whether a miss, a busy engine or an engine fault, is
/// never surfaced: the controller just moves on to the next attempt. Only a
/// capture failure on the fallback frame ends the burst with an error.
#[derive(Debug, Clone)]
pub struct BurstController {
    burst: BurstConfig,
    crop: CropConfig,
    canonical: (u32, u32),
}

impl BurstController {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            burst: config.burst.clone(),
            crop: config.crop.clone(),
            canonical: (
                config.detection.canonical_width,
                config.detection.canonical_height,
            ),
        }
    }

    /// Run up to `attempts` detections spaced `interval` apart and return the
    /// first success, or a center-crop of a fresh frame if none succeeds.
    #[instrument(skip_all, fields(source = %camera.source_name()))]
    pub async fn run<C>(&self, dispatcher: &Dispatcher, camera: &C) -> Result<BurstOutcome>
    where
        C: FrameCapturer + ?Sized,
    {
        let attempts = self.burst.attempts.max(1);

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.burst.interval()).await;
            }

            let frame = match camera.capture_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(attempt, error = %e, "Frame capture failed");
                    continue;
                }
            };

            let handle = dispatcher.detect(frame);
            match handle.wait_timeout(self.burst.attempt_timeout()).await {
                Ok(Some(image)) => {
                    info!(attempt, "Marker rectified");
                    return Ok(BurstOutcome {
                        image,
                        attempts: attempt,
                    });
                }
                Ok(None) => debug!(attempt, "No marker on this attempt"),
                Err(e) => warn!(attempt, error = %e, "Detection attempt failed"),
            }
        }

        info!(attempts, "No marker after burst; using center crop");
        let frame = frame_to_image(camera.capture_frame()?)?;
        let (width, height) = self.canonical;
        let cropped = center_crop_fallback(&frame, width, height, self.crop.fallback_fill);
        Ok(BurstOutcome {
            image: RectifiedImage::center_crop(cropped),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stickerscan_bridge::ReplayCamera;
    use stickerscan_core::error::StickerError;
    use stickerscan_core::types::PixelBuffer;
    use stickerscan_vision::{Origin, synthetic};

    use crate::engine::rectifier_loader;

    fn config() -> ScanConfig {
        let mut config = ScanConfig::default();
        config.burst.interval_ms = 10;
        config
    }

    fn ready_dispatcher(config: &ScanConfig) -> Dispatcher {
        let dispatcher = Dispatcher::start(rectifier_loader(config.detection.clone())).expect("start");
        dispatcher.wait_ready(Duration::from_secs(5)).expect("ready");
        dispatcher
    }

    struct Broken;

    impl FrameCapturer for Broken {
        fn capture_frame(&self) -> Result<PixelBuffer> {
            Err(StickerError::Capture("sensor unplugged".into()))
        }

        fn source_name(&self) -> String {
            "broken".into()
        }
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let config = config();
        let dispatcher = ready_dispatcher(&config);
        let camera = ReplayCamera::from_images(vec![
            synthetic::blank_frame(480, 360),
            synthetic::blank_frame(480, 360),
            synthetic::blank_frame(480, 360),
            synthetic::marker_frame(480, 360, 20000.0, 1.826, 8.0),
            synthetic::blank_frame(480, 360),
        ])
        .expect("frames");

        let outcome = BurstController::new(&config)
            .run(&dispatcher, &camera)
            .await
            .expect("burst");

        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.image.origin(), Origin::Perspective);
        assert_eq!(outcome.image.dimensions(), (600, 328));
        assert_eq!(camera.captures(), 4, "no fifth capture");
    }

    #[tokio::test]
    async fn all_misses_fall_back_to_center_crop() {
        let config = config();
        let dispatcher = ready_dispatcher(&config);
        let camera = ReplayCamera::from_images(vec![synthetic::blank_frame(480, 360)]).expect("frames");

        let outcome = BurstController::new(&config)
            .run(&dispatcher, &camera)
            .await
            .expect("burst");

        assert_eq!(outcome.attempts, 5);
        assert_eq!(outcome.image.origin(), Origin::CenterCrop);
        assert_eq!(outcome.image.dimensions(), (600, 328));
        assert_eq!(camera.captures(), 6, "five attempts plus the fallback frame");

        let stats = dispatcher.stats();
        assert_eq!(stats.dispatched, 5);
        assert_eq!(stats.settled, 5);
    }

    #[tokio::test]
    async fn first_frame_hit_needs_one_attempt() {
        let config = config();
        let dispatcher = ready_dispatcher(&config);
        let camera = ReplayCamera::from_images(vec![synthetic::marker_frame(480, 360, 20000.0, 1.826, -20.0)])
            .expect("frames");

        let outcome = BurstController::new(&config)
            .run(&dispatcher, &camera)
            .await
            .expect("burst");
        assert_eq!(outcome.attempts, 1);
        assert_eq!(camera.captures(), 1);
    }

    #[tokio::test]
    async fn capture_failure_on_fallback_is_an_error() {
        let config = config();
        let dispatcher = ready_dispatcher(&config);

        let err = BurstController::new(&config)
            .run(&dispatcher, &Broken)
            .await
            .unwrap_err();
        assert!(matches!(err, StickerError::Capture(_)));
        assert_eq!(dispatcher.stats().dispatched, 0);
    }
}
