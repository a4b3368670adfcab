use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use wallspace_common::{SessionId, SurfaceSize};
use wallspace_input::PointerSample;
use wallspace_render::{FrameStatus, NativeHandle, NativeRenderer, RenderError};

use crate::failure::SessionFailure;
use crate::session::SessionConfig;
use crate::state::{SessionState, StateCell};

/// Frames logged individually at the start of each session.
const LOGGED_FRAMES: u64 = 3;

/// Messages from the controller side to the session thread.
#[derive(Debug)]
pub(crate) enum Signal {
    /// Re-check the intent flags now instead of at the end of the wait.
    Wake,
    Pointer(PointerSample),
}

/// Why the session thread is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitKind {
    /// Not rendering; waiting for intent to change.
    Idle,
    /// Holding the frame cap between two frames.
    Pace,
}

/// State shared between a `RenderSession` and its thread.
///
/// `running` and `rendering` are written by the controller side; the thread
/// only reads them, and clears both itself on exit.
pub(crate) struct Shared {
    pub(crate) running: AtomicBool,
    pub(crate) rendering: AtomicBool,
    pub(crate) state: StateCell,
    pub(crate) frames: AtomicU64,
    pub(crate) failure: Mutex<Option<SessionFailure>>,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            rendering: AtomicBool::new(false),
            state: StateCell::new(),
            frames: AtomicU64::new(0),
            failure: Mutex::new(None),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn is_rendering(&self) -> bool {
        self.rendering.load(Ordering::Acquire)
    }

    fn record_failure(&self, failure: SessionFailure) {
        let mut slot = self.failure.lock();
        if slot.is_none() {
            *slot = Some(failure);
        }
    }
}

/// The session thread body: init, frame loop, destroy.
pub(crate) struct Worker<R: NativeRenderer> {
    pub(crate) id: SessionId,
    pub(crate) size: SurfaceSize,
    pub(crate) handle: NativeHandle<R>,
    pub(crate) surface: R::Surface,
    pub(crate) shared: std::sync::Arc<Shared>,
    pub(crate) signals: Receiver<Signal>,
    pub(crate) config: SessionConfig,
}

impl<R: NativeRenderer> Worker<R> {
    pub(crate) fn run(mut self) {
        let _span =
            tracing::info_span!("render_session", session = %self.id, size = %self.size).entered();

        if self.shared.is_running() {
            self.init_and_render();
        } else {
            tracing::info!("stop requested before init, surface left untouched");
        }

        self.finish();
    }

    fn init_and_render(&mut self) {
        match self.handle.init(&self.surface, self.size) {
            Ok(()) => {
                self.shared.state.advance(SessionState::Initialized);
                tracing::info!("native renderer initialized");
                self.frame_loop();
            }
            Err(e) => {
                let failure = SessionFailure::Initialization(e);
                tracing::error!("{failure}");
                self.shared.record_failure(failure);
            }
        }
    }

    /// Clear intent, destroy if live, release the surface, enter `Stopped`.
    fn finish(mut self) {
        self.shared.running.store(false, Ordering::Release);
        self.shared.rendering.store(false, Ordering::Release);
        self.shared.state.advance(SessionState::Stopping);

        match self.handle.destroy() {
            Ok(()) => tracing::info!("native renderer destroyed"),
            Err(RenderError::NotInitialized) => {
                tracing::debug!("{}", SessionFailure::UnexpectedDestroy);
            }
            Err(e) => tracing::error!("native destroy failed: {e}"),
        }

        drop(self.surface);
        let frames = self.handle.frames();
        self.shared.frames.store(frames, Ordering::Release);
        self.shared.state.advance(SessionState::Stopped);
        tracing::info!(frames, "render session stopped");
    }

    fn frame_loop(&mut self) {
        while self.shared.is_running() {
            if !self.drain_signals() || !self.shared.is_running() {
                break;
            }

            if !self.shared.is_rendering() {
                self.shared.state.advance(SessionState::Paused);
                self.wait_for_signal(Instant::now() + self.config.idle_quantum, WaitKind::Idle);
                continue;
            }

            self.shared.state.advance(SessionState::Rendering);
            let frame_start = Instant::now();
            match self.handle.render() {
                Ok(status) => {
                    let frame = self.handle.frames();
                    self.shared.frames.store(frame, Ordering::Release);
                    if frame <= LOGGED_FRAMES {
                        tracing::debug!(frame, "frame rendered");
                    } else if frame == LOGGED_FRAMES + 1 {
                        tracing::debug!("rendering steady, suppressing per-frame logs");
                    }
                    if status == FrameStatus::Quit {
                        tracing::info!(frame, "renderer requested quit");
                        break;
                    }
                }
                Err(e) => {
                    let failure = SessionFailure::Render {
                        frame: self.handle.frames() + 1,
                        source: e,
                    };
                    tracing::error!("{failure}");
                    self.shared.record_failure(failure);
                    break;
                }
            }

            match self.config.frame_interval {
                Some(interval) => self.wait_for_signal(frame_start + interval, WaitKind::Pace),
                None => thread::yield_now(),
            }
        }
    }

    /// Deliver queued pointer samples without blocking. Returns false once
    /// the controller side is gone.
    fn drain_signals(&mut self) -> bool {
        loop {
            match self.signals.try_recv() {
                Ok(Signal::Pointer(sample)) => {
                    self.handle.pointer_event(sample);
                }
                Ok(Signal::Wake) => {}
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => {
                    self.shared.running.store(false, Ordering::Release);
                    return false;
                }
            }
        }
    }

    /// Sleep until `deadline`, delivering pointer samples as they arrive.
    /// A stop request always ends the wait early; a wake signal only ends
    /// an idle wait.
    fn wait_for_signal(&mut self, deadline: Instant, kind: WaitKind) {
        while self.shared.is_running() {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            match self.signals.recv_timeout(deadline - now) {
                Ok(Signal::Pointer(sample)) => {
                    self.handle.pointer_event(sample);
                }
                Ok(Signal::Wake) if kind == WaitKind::Pace => {}
                Ok(Signal::Wake) | Err(RecvTimeoutError::Timeout) => return,
                Err(RecvTimeoutError::Disconnected) => {
                    self.shared.running.store(false, Ordering::Release);
                    return;
                }
            }
        }
    }
}
