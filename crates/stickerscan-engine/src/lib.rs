// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// stickerscan-engine: Execution side of the sticker pipeline.
//
// The rectification engine runs on its own thread and talks to the caller only
// through the message protocol. The dispatcher is the caller-facing proxy that
// enforces single-flight and settles every job exactly once; the burst
// controller turns one scan event into a short series of attempts; the OCR
// client ships the final crop to the recognition backend.

pub mod burst;
pub mod dispatcher;
pub mod engine;
pub mod ocr_client;
pub mod protocol;

pub use burst::{BurstController, BurstOutcome};
pub use dispatcher::{DetectionHandle, DispatchStats, Dispatcher};
pub use engine::{DetectorLoader, MarkerDetector, rectifier_loader};
pub use ocr_client::{OcrClient, OcrReading};
pub use protocol::{EngineCommand, EngineEvent};
