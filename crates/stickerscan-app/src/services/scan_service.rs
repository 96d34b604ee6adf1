// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session: capture, burst detection, marks crop, then OCR.
//
// The service owns the rectification engine for its whole lifetime and shuts
// it down explicitly (or on drop). One `scan` call corresponds to one
// user-triggered scan event.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::Serialize;
use stickerscan_bridge::FrameCapturer;
use stickerscan_core::ScanConfig;
use stickerscan_core::error::Result;
use stickerscan_engine::engine::rectifier_loader;
use stickerscan_engine::{BurstController, DispatchStats, Dispatcher, OcrClient};
use stickerscan_vision::rectified::encode_jpeg;
use stickerscan_vision::{Origin, RectifiedImage};
use tracing::{info, instrument, warn};

/// Summary of one scan, printed as JSON by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub source: String,
    pub origin: Origin,
    pub attempts: u32,
    pub rectified_size: (u32, u32),
    pub marks_size: (u32, u32),
    /// Recognised score; `None` means the user enters it by hand.
    pub score: Option<String>,
    pub confidence: Option<f64>,
    pub dispatch: DispatchStats,
}

/// Images and report from one scan.
#[derive(Debug)]
pub struct ScanOutput {
    pub report: ScanReport,
    pub rectified: RectifiedImage,
    pub marks: RgbaImage,
}

impl ScanOutput {
    /// Write `rectified.jpg` and `marks.jpg` into `dir`.
    pub fn save_images(&self, dir: &Path, quality: u8) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(dir)?;
        let rectified_path = dir.join("rectified.jpg");
        let marks_path = dir.join("marks.jpg");
        std::fs::write(&rectified_path, self.rectified.to_jpeg_bytes(quality)?)?;
        std::fs::write(&marks_path, encode_jpeg(&self.marks, quality)?)?;
        info!(dir = %dir.display(), "Scan images written");
        Ok((rectified_path, marks_path))
    }
}

pub struct ScanService {
    config: ScanConfig,
    dispatcher: Dispatcher,
    burst: BurstController,
    ocr: Option<OcrClient>,
}

impl ScanService {
    /// Validate the config, start the engine and build the OCR client.
    ///
    /// With `use_ocr` false, or no endpoint configured, scans stop after the
    /// crop and leave the score empty.
    pub fn start(config: ScanConfig, use_ocr: bool) -> Result<Self> {
        config.validate()?;
        let dispatcher = Dispatcher::start(rectifier_loader(config.detection.clone()))?;
        let ocr = if use_ocr {
            OcrClient::from_config(&config.ocr)?
        } else {
            None
        };
        match &ocr {
            Some(client) => info!(endpoint = client.endpoint(), "OCR enabled"),
            None => info!("OCR disabled; scores are entered manually"),
        }
        Ok(Self {
            burst: BurstController::new(&config),
            config,
            dispatcher,
            ocr,
        })
    }

    /// Wait until the engine is ready. Scans started earlier fall back to the
    /// center crop, so callers wanting detection wait here first.
    pub async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        self.dispatcher.ready(timeout).await
    }

    /// Run one scan event against `camera`.
    #[instrument(skip_all, fields(source = %camera.source_name()))]
    pub async fn scan<C>(&self, camera: &C) -> Result<ScanOutput>
    where
        C: FrameCapturer + ?Sized,
    {
        let started_at = Utc::now();
        let outcome = self.burst.run(&self.dispatcher, camera).await?;
        let rectified = outcome.image;
        let marks = rectified.marks_region(self.config.crop.marks_fraction);

        let (score, confidence) = match &self.ocr {
            None => (None, None),
            Some(client) => match client.recognize(&marks).await {
                Ok(reading) => {
                    let score = reading.usable_score().map(str::to_owned);
                    if score.is_none() {
                        info!(raw = %reading.score, "OCR could not read the marks; leaving score empty");
                    }
                    (score, Some(reading.confidence))
                }
                Err(e) => {
                    warn!(error = %e, "OCR failed; leaving score empty");
                    (None, None)
                }
            },
        };

        let report = ScanReport {
            started_at,
            source: camera.source_name(),
            origin: rectified.origin(),
            attempts: outcome.attempts,
            rectified_size: rectified.dimensions(),
            marks_size: marks.dimensions(),
            score,
            confidence,
            dispatch: self.dispatcher.stats(),
        };
        info!(origin = ?report.origin, attempts = report.attempts, score = ?report.score, "Scan complete");

        Ok(ScanOutput {
            report,
            rectified,
            marks,
        })
    }

    /// Stop the engine and wait for its threads.
    pub fn shutdown(mut self) {
        self.dispatcher.shutdown();
    }
}
