// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// stickerscan-bridge: Frame sources for the scan pipeline.
//
// The burst controller only ever sees the `FrameCapturer` trait. Desktop and
// CI builds have no live camera and get the stub; still images on disk can be
// replayed as a camera through `ReplayCamera`.

pub mod replay;
pub mod stub;
pub mod traits;

pub use replay::ReplayCamera;
pub use stub::StubCamera;
pub use traits::FrameCapturer;

/// The live camera for the target platform.
///
/// No native camera bridge is built into this workspace, so every target
/// currently gets [`StubCamera`].
pub fn live_camera() -> Box<dyn FrameCapturer> {
    Box::new(StubCamera)
}
