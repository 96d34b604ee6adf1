// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the sticker rectification pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StickerError};

/// Bytes per pixel of every buffer crossing the engine boundary (RGBA8).
pub const CHANNELS: usize = 4;

/// Identifier of one detection job.
///
/// Ids are handed out by the dispatcher from a monotonically increasing
/// counter and are never reused within one dispatcher's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl JobId {
    /// The id following this one, or `None` once the counter is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A raw 4-channel, 8-bit frame.
///
/// The buffer is owned exclusively. Sending it to the engine moves it: the
/// pixel data is transferred, never duplicated, and the sender can no longer
/// touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking that the length matches the geometry.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = Self::expected_len(width, height);
        if data.len() != expected {
            return Err(StickerError::InvalidFrame {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap raw bytes without validating them.
    ///
    /// Used on the receiving side of the engine protocol, where a malformed
    /// buffer must be answered with an error for its job rather than refused
    /// at construction.
    pub fn from_raw_unchecked(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Number of bytes a `width` x `height` RGBA frame occupies.
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * CHANNELS
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the byte length agrees with the declared geometry.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == Self::expected_len(self.width, self.height)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer and return its raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Whether a ready engine is currently processing a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
    Idle,
    Busy,
}

/// Lifecycle of the rectification engine.
///
/// `Uninitialized → Initializing → Ready(Idle ⇄ Busy)`, ending only in
/// `Stopped` when the owner shuts the engine down. A failed initialisation
/// drops back to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready(Activity),
    Stopped,
}

impl EngineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Ready and not processing anything, i.e. a job may be dispatched.
    pub fn accepts_jobs(&self) -> bool {
        matches!(self, Self::Ready(Activity::Idle))
    }
}
