// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification engine worker.
//
// Runs on a dedicated thread, receives `EngineCommand`s and answers every one
// that concerns a job with exactly one `EngineEvent`. The detector is loaded
// lazily on the first `Init`; until then every `Detect` is answered with
// `DetectFail` (fail closed).

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use image::RgbaImage;
use stickerscan_core::config::DetectionConfig;
use stickerscan_core::error::Result;
use stickerscan_core::types::{JobId, PixelBuffer};
use stickerscan_vision::Rectifier;
use stickerscan_vision::frame::frame_to_image;
use tracing::{debug, info, instrument, warn};

use crate::protocol::{EngineCommand, EngineEvent};

/// The vision algorithm as seen by the engine.
pub trait MarkerDetector: Send {
    /// Rectify the marker in `frame`, or `None` when there is no marker.
    fn detect(&mut self, frame: &RgbaImage) -> Option<RgbaImage>;
}

impl MarkerDetector for Rectifier {
    fn detect(&mut self, frame: &RgbaImage) -> Option<RgbaImage> {
        self.rectify(frame)
    }
}

/// Builds the detector on the engine thread. Called at most once.
pub type DetectorLoader = Box<dyn FnOnce() -> Result<Box<dyn MarkerDetector>> + Send>;

/// A loader for the real [`Rectifier`].
pub fn rectifier_loader(config: DetectionConfig) -> DetectorLoader {
    Box::new(move || -> Result<Box<dyn MarkerDetector>> { Ok(Box::new(Rectifier::new(config)?)) })
}

pub(crate) struct EngineWorker {
    loader: Option<DetectorLoader>,
    detector: Option<Box<dyn MarkerDetector>>,
}

impl EngineWorker {
    pub(crate) fn new(loader: DetectorLoader) -> Self {
        Self {
            loader: Some(loader),
            detector: None,
        }
    }

    /// Spawn the worker loop on its own named thread.
    pub(crate) fn spawn(
        self,
        commands: Receiver<EngineCommand>,
        events: Sender<EngineEvent>,
    ) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("stickerscan-engine".into())
            .spawn(move || self.run(commands, events))
    }

    fn run(mut self, commands: Receiver<EngineCommand>, events: Sender<EngineEvent>) {
        info!("Rectification engine started");
        while let Ok(command) = commands.recv() {
            let event = match command {
                EngineCommand::Init => self.init(),
                EngineCommand::Detect { job_id, frame } => self.process(job_id, frame),
                EngineCommand::Shutdown => break,
            };
            if events.send(event).is_err() {
                warn!("Engine event receiver dropped; stopping");
                break;
            }
        }
        info!("Rectification engine stopped");
    }

    fn init(&mut self) -> EngineEvent {
        if self.detector.is_some() {
            return EngineEvent::InitSuccess;
        }
        let Some(loader) = self.loader.take() else {
            return EngineEvent::InitFailed {
                message: "detector loader already consumed".into(),
            };
        };

        match catch_unwind(AssertUnwindSafe(loader)) {
            Ok(Ok(detector)) => {
                self.detector = Some(detector);
                EngineEvent::InitSuccess
            }
            Ok(Err(e)) => EngineEvent::InitFailed {
                message: e.to_string(),
            },
            Err(panic) => EngineEvent::InitFailed {
                message: panic_message(panic.as_ref()),
            },
        }
    }

    #[instrument(skip(self, frame), fields(width = frame.width(), height = frame.height()))]
    fn process(&mut self, job_id: JobId, frame: PixelBuffer) -> EngineEvent {
        let Some(detector) = self.detector.as_mut() else {
            debug!("Detect before ready; failing closed");
            return EngineEvent::DetectFail { job_id };
        };

        let image = match frame_to_image(frame) {
            Ok(image) => image,
            Err(e) => {
                warn!(error = %e, "Malformed frame");
                return EngineEvent::Error {
                    job_id,
                    message: e.to_string(),
                };
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| detector.detect(&image)));
        drop(image);

        match outcome {
            Ok(Some(rectified)) => {
                let (width, height) = rectified.dimensions();
                EngineEvent::DetectSuccess {
                    job_id,
                    data: rectified.into_raw(),
                    width,
                    height,
                }
            }
            Ok(None) => EngineEvent::DetectFail { job_id },
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(%message, "Detector panicked");
                EngineEvent::Error { job_id, message }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("detector panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("detector panicked: {s}")
    } else {
        "detector panicked".into()
    }
}
