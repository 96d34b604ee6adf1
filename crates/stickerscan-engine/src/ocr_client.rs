// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client for the remote recognition backend.
//
// One authenticated multipart upload per scan: the marks region as JPEG in,
// `{ "score": string, "confidence": number }` out. Retries and timeouts beyond
// the single request timeout belong to the backend.

use image::RgbaImage;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use stickerscan_core::config::OcrConfig;
use stickerscan_core::error::{Result, StickerError};
use stickerscan_vision::rectified::encode_jpeg;
use tracing::{debug, info, instrument};

/// Scores the backend uses to say "I could not read this".
pub const UNREADABLE_SCORES: [&str; 2] = ["ERROR_UNCERTAIN", "0"];

/// Multipart field carrying the image.
const IMAGE_FIELD: &str = "image";

/// Backend answer for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrReading {
    pub score: String,
    pub confidence: f64,
}

impl OcrReading {
    /// The recognised score, or `None` for an empty or sentinel answer.
    pub fn usable_score(&self) -> Option<&str> {
        let score = self.score.trim();
        if score.is_empty() || UNREADABLE_SCORES.contains(&score) {
            None
        } else {
            Some(score)
        }
    }
}

pub struct OcrClient {
    http: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
    jpeg_quality: u8,
}

impl OcrClient {
    /// Build a client from config, or `None` when no endpoint is configured.
    pub fn from_config(config: &OcrConfig) -> Result<Option<Self>> {
        match &config.endpoint {
            Some(endpoint) => Self::new(endpoint.clone(), config).map(Some),
            None => Ok(None),
        }
    }

    pub fn new(endpoint: impl Into<String>, config: &OcrConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StickerError::OcrRequest(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            auth_token: config.auth_token.clone(),
            jpeg_quality: config.jpeg_quality,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload `image` and return the backend's reading.
    #[instrument(skip_all, fields(endpoint = %self.endpoint, width = image.width(), height = image.height()))]
    pub async fn recognize(&self, image: &RgbaImage) -> Result<OcrReading> {
        let jpeg = encode_jpeg(image, self.jpeg_quality)?;
        debug!(bytes = jpeg.len(), "Uploading marks region");

        let part = Part::bytes(jpeg)
            .file_name("marks.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| StickerError::OcrRequest(e.to_string()))?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let mut request = self.http.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StickerError::OcrRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StickerError::OcrStatus {
                status: status.as_u16(),
                body,
            });
        }

        let reading: OcrReading = response
            .json()
            .await
            .map_err(|e| StickerError::OcrRequest(format!("invalid response body: {e}")))?;
        info!(score = %reading.score, confidence = reading.confidence, "OCR reading received");
        Ok(reading)
    }
}
