// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Stickerscan.
//
// "No marker in this frame" is deliberately absent: a miss is an ordinary
// outcome and travels as `Ok(None)`, never as an error.

use thiserror::Error;

use crate::types::JobId;

/// Top-level error type for all Stickerscan operations.
#[derive(Debug, Error)]
pub enum StickerError {
    // -- Frames and images --
    #[error("invalid frame: {width}x{height} needs {expected} bytes, got {actual}")]
    InvalidFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("frame capture failed: {0}")]
    Capture(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Engine --
    #[error("rectification engine failed to initialise: {0}")]
    EngineInit(String),

    #[error("rectification engine has stopped")]
    EngineStopped,

    #[error("engine fault on job {job_id}: {message}")]
    EngineFault { job_id: JobId, message: String },

    #[error("timed out waiting for job {0}")]
    DetectTimeout(JobId),

    // -- OCR backend --
    #[error("OCR request failed: {0}")]
    OcrRequest(String),

    #[error("OCR backend returned HTTP {status}: {body}")]
    OcrStatus { status: u16, body: String },

    // -- Platform --
    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, StickerError>;
