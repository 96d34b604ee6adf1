// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanner configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StickerError};

/// Persistent scanner settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub detection: DetectionConfig,
    pub burst: BurstConfig,
    pub crop: CropConfig,
    pub ocr: OcrConfig,
}

/// Parameters of the marker detection and warp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Width of the canonical rectangle the marker is warped into.
    pub canonical_width: u32,
    /// Height of the canonical rectangle.
    pub canonical_height: u32,
    /// Physical width/height ratio of the printed marker (42mm x 23mm).
    pub marker_aspect: f64,
    /// Accepted absolute deviation from `marker_aspect`.
    pub aspect_tolerance: f64,
    /// Contours enclosing less than this many square pixels are noise.
    pub min_contour_area: f64,
    /// Side of the square Gaussian blur kernel (odd).
    pub blur_kernel: u32,
    /// Side of the Gaussian neighbourhood for adaptive thresholding (odd).
    pub threshold_block_size: u32,
    /// Constant subtracted from the local mean before thresholding.
    pub threshold_offset: f64,
    /// Douglas–Peucker epsilon as a fraction of the contour perimeter.
    pub polygon_epsilon_fraction: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            canonical_width: 600,
            canonical_height: 328,
            marker_aspect: 42.0 / 23.0,
            aspect_tolerance: 0.5,
            min_contour_area: 5000.0,
            blur_kernel: 5,
            threshold_block_size: 11,
            threshold_offset: 2.0,
            polygon_epsilon_fraction: 0.02,
        }
    }
}

impl DetectionConfig {
    /// Reject detection parameters the rectifier cannot run with.
    pub fn validate(&self) -> Result<()> {
        check_kernel("blur_kernel", self.blur_kernel)?;
        check_kernel("threshold_block_size", self.threshold_block_size)?;
        if self.canonical_width == 0 || self.canonical_height == 0 {
            return Err(StickerError::Config(format!(
                "canonical size must be non-zero, got {}x{}",
                self.canonical_width, self.canonical_height
            )));
        }
        if !(self.marker_aspect > 0.0) {
            return Err(StickerError::Config(format!(
                "marker_aspect must be positive, got {}",
                self.marker_aspect
            )));
        }
        if !(self.aspect_tolerance >= 0.0) || !(self.min_contour_area >= 0.0) {
            return Err(StickerError::Config(
                "aspect_tolerance and min_contour_area must be non-negative".into(),
            ));
        }
        if !(self.polygon_epsilon_fraction > 0.0) {
            return Err(StickerError::Config(format!(
                "polygon_epsilon_fraction must be positive, got {}",
                self.polygon_epsilon_fraction
            )));
        }
        Ok(())
    }

    /// Width over height of the canonical rectangle.
    pub fn canonical_aspect(&self) -> f64 {
        self.canonical_width as f64 / self.canonical_height as f64
    }
}

/// Timing of the per-scan burst of detection attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    /// Maximum detection attempts per scan event.
    pub attempts: u32,
    /// Pause between consecutive attempts, in milliseconds.
    pub interval_ms: u64,
    /// How long one attempt waits for its job before counting it as a miss.
    /// The job itself keeps running; the engine stays busy until it settles.
    pub attempt_timeout_ms: u64,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval_ms: 100,
            attempt_timeout_ms: 2000,
        }
    }
}

impl BurstConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Post-processing crops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Trailing share of the rectified width holding the handwritten digits.
    pub marks_fraction: f64,
    /// Share of the frame covered by the fallback center-crop along its
    /// limiting axis.
    pub fallback_fill: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            marks_fraction: 0.58,
            fallback_fill: 0.8,
        }
    }
}

/// Remote recognition backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Upload endpoint. OCR is skipped entirely when unset.
    pub endpoint: Option<String>,
    /// Bearer token sent with every upload.
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
    pub jpeg_quality: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            timeout_secs: 15,
            jpeg_quality: 90,
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ScanConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;

        let c = &self.crop;
        if !(c.marks_fraction > 0.0 && c.marks_fraction <= 1.0) {
            return Err(StickerError::Config(format!(
                "marks_fraction must be in (0, 1], got {}",
                c.marks_fraction
            )));
        }
        if !(c.fallback_fill > 0.0 && c.fallback_fill <= 1.0) {
            return Err(StickerError::Config(format!(
                "fallback_fill must be in (0, 1], got {}",
                c.fallback_fill
            )));
        }

        if self.burst.attempts == 0 {
            return Err(StickerError::Config("burst attempts must be at least 1".into()));
        }
        Ok(())
    }
}

fn check_kernel(name: &str, size: u32) -> Result<()> {
    if size < 3 || size % 2 == 0 {
        return Err(StickerError::Config(format!(
            "{name} must be odd and at least 3, got {size}"
        )));
    }
    Ok(())
}
