// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job dispatcher: the caller-facing proxy for the rectification engine.
//
// `detect` never blocks: it either rejects the frame on the spot (engine not
// ready, or already busy with a job) or ships it to the engine and returns a
// handle that settles when the reply arrives. A pump thread reads engine
// events and settles the matching handle. Every dispatched job is settled
// exactly once: the pending entry is removed from the table before its
// outcome is sent, so a duplicate reply finds nothing and is ignored.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use stickerscan_core::error::{Result, StickerError};
use stickerscan_core::types::{Activity, EngineState, JobId, PixelBuffer};
use stickerscan_vision::RectifiedImage;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::engine::{DetectorLoader, EngineWorker};
use crate::protocol::{EngineCommand, EngineEvent};

type Outcome = Result<Option<RectifiedImage>>;

/// Counters over the dispatcher's lifetime.
///
/// Once no job is in flight, `dispatched == settled`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub settled: u64,
    pub rejected_not_ready: u64,
    pub rejected_busy: u64,
    /// Replies whose job id had no pending handle (unknown or already settled).
    pub ignored_replies: u64,
}

struct Shared {
    state: EngineState,
    /// `None` once every id has been handed out.
    next_id: Option<JobId>,
    pending: HashMap<JobId, oneshot::Sender<Outcome>>,
    stats: DispatchStats,
    init_error: Option<String>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: EngineState::Uninitialized,
            next_id: Some(JobId(1)),
            pending: HashMap::new(),
            stats: DispatchStats::default(),
            init_error: None,
        }
    }

    /// Register a new job if the engine can take it.
    fn begin_job(&mut self) -> Option<(JobId, oneshot::Receiver<Outcome>)> {
        match self.state {
            EngineState::Ready(Activity::Idle) => {}
            EngineState::Ready(Activity::Busy) => {
                self.stats.rejected_busy += 1;
                debug!("Engine busy; rejecting frame");
                return None;
            }
            state => {
                self.stats.rejected_not_ready += 1;
                debug!(?state, "Engine not ready; rejecting frame");
                return None;
            }
        }

        let Some(job_id) = self.next_id else {
            self.stats.rejected_not_ready += 1;
            warn!("Job ids exhausted; rejecting frame");
            return None;
        };
        self.next_id = job_id.next();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(job_id, tx);
        self.state = EngineState::Ready(Activity::Busy);
        self.stats.dispatched += 1;
        Some((job_id, rx))
    }

    /// Settle `job_id` with `outcome`. Returns `false` if it was not pending.
    fn settle(&mut self, job_id: JobId, outcome: Outcome) -> bool {
        let Some(tx) = self.pending.remove(&job_id) else {
            self.stats.ignored_replies += 1;
            debug!(%job_id, "Ignoring reply for unknown or settled job");
            return false;
        };
        self.stats.settled += 1;
        if self.pending.is_empty() && self.state == EngineState::Ready(Activity::Busy) {
            self.state = EngineState::Ready(Activity::Idle);
        }
        // The caller may have stopped waiting; the job still counts as settled.
        let _ = tx.send(outcome);
        true
    }

    fn settle_all_stopped(&mut self) {
        let ids: Vec<JobId> = self.pending.keys().copied().collect();
        for job_id in ids {
            self.settle(job_id, Err(StickerError::EngineStopped));
        }
    }
}

struct Inner {
    shared: Mutex<Shared>,
    state_changed: Condvar,
    state_tx: watch::Sender<EngineState>,
}

impl Inner {
    fn new(shared: Shared) -> Self {
        let (state_tx, _) = watch::channel(shared.state);
        Self {
            shared: Mutex::new(shared),
            state_changed: Condvar::new(),
            state_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake both blocking and async readiness waiters.
    fn announce(&self, shared: &Shared) {
        self.state_tx.send_replace(shared.state);
        self.state_changed.notify_all();
    }

    fn handle_event(&self, event: EngineEvent) {
        let mut shared = self.lock();
        match event {
            EngineEvent::InitSuccess => {
                if shared.state == EngineState::Initializing {
                    shared.state = EngineState::Ready(Activity::Idle);
                    info!("Rectification engine ready");
                }
                self.announce(&shared);
            }
            EngineEvent::InitFailed { message } => {
                if shared.state == EngineState::Initializing {
                    error!(%message, "Rectification engine failed to initialise; detection disabled");
                    shared.state = EngineState::Uninitialized;
                    shared.init_error = Some(message);
                }
                self.announce(&shared);
            }
            EngineEvent::DetectSuccess {
                job_id,
                data,
                width,
                height,
            } => {
                let outcome = RectifiedImage::from_raw(width, height, data).map(Some);
                if let Err(e) = &outcome {
                    warn!(%job_id, error = %e, "Engine returned an undecodable image");
                }
                shared.settle(job_id, outcome);
            }
            EngineEvent::DetectFail { job_id } => {
                shared.settle(job_id, Ok(None));
            }
            EngineEvent::Error { job_id, message } => {
                warn!(%job_id, %message, "Engine fault");
                shared.settle(job_id, Err(StickerError::EngineFault { job_id, message }));
            }
        }
    }

    /// Read engine events until the engine hangs up.
    fn pump(&self, events: Receiver<EngineEvent>) {
        while let Ok(event) = events.recv() {
            debug!(kind = event.kind(), job_id = ?event.job_id(), "Engine event");
            self.handle_event(event);
        }
        let mut shared = self.lock();
        shared.settle_all_stopped();
        shared.state = EngineState::Stopped;
        self.announce(&shared);
    }
}

/// The pending result of one `detect` call.
#[derive(Debug)]
pub struct DetectionHandle {
    job_id: Option<JobId>,
    receiver: Option<oneshot::Receiver<Outcome>>,
}

impl DetectionHandle {
    fn rejected_now() -> Self {
        Self {
            job_id: None,
            receiver: None,
        }
    }

    /// Whether the frame was turned away without reaching the engine.
    /// A rejected handle resolves to "not found" immediately.
    pub fn rejected(&self) -> bool {
        self.receiver.is_none()
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    /// Wait for the job to settle.
    pub async fn wait(self) -> Outcome {
        match self.receiver {
            None => Ok(None),
            Some(rx) => rx.await.unwrap_or(Err(StickerError::EngineStopped)),
        }
    }

    /// Wait at most `limit`. On timeout the job is left to settle on its own
    /// and the engine stays busy until it does.
    pub async fn wait_timeout(self, limit: Duration) -> Outcome {
        let (Some(job_id), Some(rx)) = (self.job_id, self.receiver) else {
            return Ok(None);
        };
        match tokio::time::timeout(limit, rx).await {
            Ok(settled) => settled.unwrap_or(Err(StickerError::EngineStopped)),
            Err(_) => Err(StickerError::DetectTimeout(job_id)),
        }
    }
}

/// Owner of one rectification engine and its reply pump.
///
/// Created with [`Dispatcher::start`], stopped with [`Dispatcher::shutdown`]
/// or by dropping it.
pub struct Dispatcher {
    inner: Arc<Inner>,
    commands: Sender<EngineCommand>,
    engine: Option<JoinHandle<()>>,
    pump: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn the engine thread and the reply pump, then ask the engine to load
    /// its detector. Returns immediately; readiness is announced later.
    pub fn start(loader: DetectorLoader) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (evt_tx, evt_rx) = mpsc::channel();

        let inner = Arc::new(Inner::new(Shared::new()));

        let engine = EngineWorker::new(loader).spawn(cmd_rx, evt_tx)?;
        let pump_inner = Arc::clone(&inner);
        let pump = thread::Builder::new()
            .name("stickerscan-dispatch".into())
            .spawn(move || pump_inner.pump(evt_rx))?;

        let mut dispatcher = Self {
            inner,
            commands: cmd_tx,
            engine: Some(engine),
            pump: Some(pump),
        };

        {
            let mut shared = dispatcher.inner.lock();
            shared.state = EngineState::Initializing;
            dispatcher.inner.announce(&shared);
        }
        if dispatcher.commands.send(EngineCommand::Init).is_err() {
            dispatcher.shutdown();
            return Err(StickerError::EngineStopped);
        }
        Ok(dispatcher)
    }

    /// Submit a frame. The frame is moved to the engine; nothing is copied.
    ///
    /// Returns at once. If the engine is not ready or already busy the handle
    /// is pre-settled as "not found".
    pub fn detect(&self, frame: PixelBuffer) -> DetectionHandle {
        let mut shared = self.inner.lock();
        let Some((job_id, receiver)) = shared.begin_job() else {
            return DetectionHandle::rejected_now();
        };

        debug!(%job_id, width = frame.width(), height = frame.height(), "Dispatching frame");
        if self
            .commands
            .send(EngineCommand::Detect { job_id, frame })
            .is_err()
        {
            warn!(%job_id, "Engine is gone; job settled as stopped");
            shared.settle(job_id, Err(StickerError::EngineStopped));
            shared.state = EngineState::Stopped;
        }

        DetectionHandle {
            job_id: Some(job_id),
            receiver: Some(receiver),
        }
    }

    pub fn state(&self) -> EngineState {
        self.inner.lock().state
    }

    pub fn stats(&self) -> DispatchStats {
        self.inner.lock().stats
    }

    /// Block until the engine is ready, at most `timeout`.
    ///
    /// For startup code on a plain thread; async callers use [`Dispatcher::ready`].
    /// `detect` never waits.
    pub fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let guard = self.inner.lock();
        let (shared, _) = self
            .inner
            .state_changed
            .wait_timeout_while(guard, timeout, |s| s.state == EngineState::Initializing)
            .unwrap_or_else(PoisonError::into_inner);
        readiness(&shared, timeout)
    }

    /// Async form of [`Dispatcher::wait_ready`]; parks the task, not the thread.
    pub async fn ready(&self, timeout: Duration) -> Result<()> {
        let mut states = self.inner.state_tx.subscribe();
        // Either way the answer is read back from the shared state below.
        let _ = tokio::time::timeout(
            timeout,
            states.wait_for(|state| *state != EngineState::Initializing),
        )
        .await;
        readiness(&self.inner.lock(), timeout)
    }

    /// Stop the engine and join both threads.
    ///
    /// An in-flight job is allowed to finish and settles normally; anything
    /// still pending afterwards is rejected with `EngineStopped`. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(engine) = self.engine.take() else {
            return;
        };
        info!("Shutting down rectification engine");
        self.inner.lock().state = EngineState::Stopped;
        let _ = self.commands.send(EngineCommand::Shutdown);
        if engine.join().is_err() {
            error!("Engine thread panicked");
        }
        if let Some(pump) = self.pump.take() {
            if pump.join().is_err() {
                error!("Dispatch pump thread panicked");
            }
        }

        let mut shared = self.inner.lock();
        shared.settle_all_stopped();
        shared.state = EngineState::Stopped;
        self.inner.announce(&shared);
    }
}

fn readiness(shared: &Shared, timeout: Duration) -> Result<()> {
    match shared.state {
        EngineState::Ready(_) => Ok(()),
        EngineState::Stopped => Err(StickerError::EngineStopped),
        EngineState::Uninitialized => Err(StickerError::EngineInit(
            shared
                .init_error
                .clone()
                .unwrap_or_else(|| "engine was never started".into()),
        )),
        EngineState::Initializing => Err(StickerError::EngineInit(format!(
            "engine not ready after {timeout:?}"
        ))),
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
