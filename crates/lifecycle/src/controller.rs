use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use wallspace_common::{SessionId, SurfaceSize};
use wallspace_input::{PointerPhase, PointerSample};
use wallspace_render::{NativeRenderer, RendererFactory};
use wallspace_session::{RenderSession, SessionConfig, SessionState, StopOutcome};

use crate::config::ControllerConfig;

/// Longest a pointer event waits out a brief, non-transition lock holder
/// such as `status` before it is dropped.
const POINTER_LOCK_WAIT: Duration = Duration::from_millis(2);

/// Surface handle type accepted by a controller built on factory `F`.
pub type SurfaceOf<F> = <<F as RendererFactory>::Renderer as NativeRenderer>::Surface;

struct ControllerState {
    active: Option<RenderSession>,
    /// Sessions told to stop by a surface-lost event but not yet joined.
    retiring: Vec<RenderSession>,
    visible: bool,
    sessions_started: u64,
}

/// Serializes platform surface lifecycle events into render session
/// create/replace/destroy transitions.
///
/// Every entry point may be called from any platform thread. Entry points
/// that touch the active session take one controller-wide lock, so a
/// shutdown racing a surface change cannot leave two sessions alive.
pub struct LifecycleController<F: RendererFactory> {
    config: ControllerConfig,
    session_config: SessionConfig,
    factory: F,
    inner: Mutex<ControllerState>,
    /// Set while a surface transition or shutdown holds `inner`.
    transitioning: AtomicBool,
}

/// Clears the transition flag when the transition ends.
struct TransitionGuard<'a>(&'a AtomicBool);

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<F: RendererFactory> LifecycleController<F> {
    pub fn new(factory: F, config: ControllerConfig) -> Self {
        let session_config = config.session_config();
        Self {
            config,
            session_config,
            factory,
            inner: Mutex::new(ControllerState {
                active: None,
                retiring: Vec::new(),
                visible: false,
                sessions_started: 0,
            }),
            transitioning: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The platform created a surface.
    pub fn on_surface_available(&self, surface: SurfaceOf<F>, width: u32, height: u32) {
        self.replace_session("surface_available", surface, SurfaceSize::new(width, height));
    }

    /// The platform changed the surface (format or size). Always rebinds.
    pub fn on_surface_changed(&self, surface: SurfaceOf<F>, width: u32, height: u32) {
        self.replace_session("surface_changed", surface, SurfaceSize::new(width, height));
    }

    /// The platform destroyed the surface.
    ///
    /// Does not wait for the session thread: the session is told to stop
    /// and parked, and the next transition joins it before doing anything.
    pub fn on_surface_lost(&self) {
        let mut state = self.inner.lock();
        match state.active.take() {
            Some(session) => {
                session.request_stop();
                tracing::info!(session = %session.id(), "surface lost, session stopping");
                state.retiring.push(session);
            }
            None => tracing::debug!("surface lost with no active session"),
        }
    }

    /// Record visibility. Becoming visible resumes rendering; becoming
    /// invisible is ignored for pausing and rendering continues.
    pub fn on_visibility_changed(&self, visible: bool) {
        let mut state = self.inner.lock();
        state.visible = visible;
        match (&state.active, visible) {
            (Some(session), true) => {
                tracing::debug!(session = %session.id(), "visible, resuming rendering");
                session.resume_rendering();
            }
            (Some(session), false) => {
                tracing::debug!(session = %session.id(), "invisible, rendering continues");
            }
            (None, _) => tracing::debug!(visible, "visibility changed with no active session"),
        }
    }

    /// Forward a pointer event to the active session.
    ///
    /// Returns whether the sample was queued. Samples are dropped, never
    /// queued for later, when no session is active or a surface transition
    /// is in progress. Short lock holders (`status`, visibility changes)
    /// are waited out for at most a couple of milliseconds.
    pub fn on_pointer_event(&self, x: f32, y: f32, phase: PointerPhase) -> bool {
        let sample = PointerSample::classify(x, y, phase);
        if self.transitioning.load(Ordering::Acquire) {
            tracing::trace!("pointer dropped: transition in progress");
            return false;
        }
        let Some(state) = self.inner.try_lock_for(POINTER_LOCK_WAIT) else {
            tracing::trace!("pointer dropped: controller busy");
            return false;
        };
        match &state.active {
            Some(session) => session.send_pointer(sample),
            None => false,
        }
    }

    /// Stop everything and wait, bounded by the join timeout. Idempotent.
    pub fn on_shutdown(&self) {
        let mut state = self.inner.lock();
        let _transition = self.begin_transition();
        if self.retire_all(&mut state) {
            tracing::info!("lifecycle controller shut down");
        }
    }

    /// Read-only snapshot of the controller.
    pub fn status(&self) -> ControllerStatus {
        let state = self.inner.lock();
        ControllerStatus {
            active: state.active.as_ref().map(|s| SessionStatus {
                id: s.id(),
                size: s.size(),
                state: s.state(),
                rendering: s.is_rendering(),
                frames: s.frames_rendered(),
            }),
            retiring: state.retiring.len(),
            visible: state.visible,
            sessions_started: state.sessions_started,
        }
    }

    fn replace_session(&self, event: &'static str, surface: SurfaceOf<F>, size: SurfaceSize) {
        let mut state = self.inner.lock();
        let _transition = self.begin_transition();
        let _span = tracing::info_span!("surface_transition", event, %size).entered();

        if self.retire_all(&mut state) {
            let settle = self.config.settle_delay();
            tracing::debug!(?settle, "settling before native init");
            thread::sleep(settle);
        }

        if size.is_empty() {
            tracing::warn!("surface has an empty dimension, starting anyway");
        }
        if !state.visible {
            tracing::debug!("surface reported invisible, rendering regardless");
        }

        let renderer = self.factory.create();
        match RenderSession::start(renderer, surface, size, self.session_config.clone()) {
            Ok(session) => {
                session.resume_rendering();
                state.sessions_started += 1;
                state.active = Some(session);
            }
            Err(failure) => tracing::error!("{failure}"),
        }
    }

    /// Mark a transition for pointer routing. Call with `inner` held.
    fn begin_transition(&self) -> TransitionGuard<'_> {
        self.transitioning.store(true, Ordering::Release);
        TransitionGuard(&self.transitioning)
    }

    /// Stop the active and all retiring sessions and join them within one
    /// shared deadline. Returns whether there was anything to stop.
    fn retire_all(&self, state: &mut ControllerState) -> bool {
        let mut sessions: Vec<RenderSession> = state.retiring.drain(..).collect();
        sessions.extend(state.active.take());
        if sessions.is_empty() {
            return false;
        }

        for session in &sessions {
            session.request_stop();
        }

        let deadline = Instant::now() + self.config.join_timeout();
        for mut session in sessions {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match session.join(remaining) {
                StopOutcome::Stopped(report) => tracing::info!("{report}"),
                StopOutcome::TimedOut { waited } => tracing::warn!(
                    session = %session.id(),
                    ?waited,
                    "proceeding without confirmed teardown"
                ),
            }
        }
        true
    }
}

impl<F: RendererFactory> Drop for LifecycleController<F> {
    fn drop(&mut self) {
        self.on_shutdown();
    }
}

/// Snapshot of one session for status output.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub id: SessionId,
    pub size: SurfaceSize,
    pub state: SessionState,
    pub rendering: bool,
    pub frames: u64,
}

/// Snapshot of the controller for status output.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    pub active: Option<SessionStatus>,
    pub retiring: usize,
    pub visible: bool,
    pub sessions_started: u64,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Controller: visible={} started={} retiring={} active=",
            self.visible, self.sessions_started, self.retiring
        )?;
        match &self.active {
            Some(s) => write!(
                f,
                "{} {} {} rendering={} frames={}",
                s.id, s.size, s.state, s.rendering, s.frames
            ),
            None => f.write_str("none"),
        }
    }
}
