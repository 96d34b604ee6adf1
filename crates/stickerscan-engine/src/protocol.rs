// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Messages exchanged across the engine boundary.
//
// Both directions travel over channels and every payload is moved: a frame
// sent with `Detect` belongs to the engine from then on, and the rectified
// bytes in `DetectSuccess` belong to the caller.

use stickerscan_core::types::{JobId, PixelBuffer};

/// Caller → engine.
#[derive(Debug)]
pub enum EngineCommand {
    /// Load the detector. Only the first `Init` has any effect.
    Init,
    /// Run detection on one frame. Width and height travel inside the buffer.
    Detect { job_id: JobId, frame: PixelBuffer },
    /// Stop the worker loop after the current job.
    Shutdown,
}

/// Engine → caller.
#[derive(Debug)]
pub enum EngineEvent {
    InitSuccess,
    InitFailed {
        message: String,
    },
    DetectSuccess {
        job_id: JobId,
        data: Vec<u8>,
        width: u32,
        height: u32,
    },
    /// No qualifying marker, or the engine was not ready.
    DetectFail {
        job_id: JobId,
    },
    Error {
        job_id: JobId,
        message: String,
    },
}

impl EngineEvent {
    /// The job this event settles, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Self::InitSuccess | Self::InitFailed { .. } => None,
            Self::DetectSuccess { job_id, .. }
            | Self::DetectFail { job_id }
            | Self::Error { job_id, .. } => Some(*job_id),
        }
    }

    /// Short protocol name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitSuccess => "INIT_SUCCESS",
            Self::InitFailed { .. } => "INIT_FAILED",
            Self::DetectSuccess { .. } => "DETECT_SUCCESS",
            Self::DetectFail { .. } => "DETECT_FAIL",
            Self::Error { .. } => "ERROR",
        }
    }
}
