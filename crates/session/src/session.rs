use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use wallspace_common::{SessionId, SurfaceSize};
use wallspace_input::PointerSample;
use wallspace_render::{NativeHandle, NativeRenderer};

use crate::failure::{SessionFailure, SessionReport, StopOutcome};
use crate::state::SessionState;
use crate::worker::{Shared, Signal, Worker};

/// Capacity of the controller → session signal queue. Pointer samples that
/// do not fit are dropped.
const SIGNAL_CAPACITY: usize = 64;

/// Timing knobs for a session's frame loop.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Wait between intent checks while not rendering.
    pub idle_quantum: Duration,
    /// Minimum time between frame starts. `None` only yields between frames.
    pub frame_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_quantum: Duration::from_millis(100),
            frame_interval: Some(Duration::from_secs_f64(1.0 / 60.0)),
        }
    }
}

/// One background render thread bound to one surface.
///
/// The session owns its native renderer for its whole life; the renderer
/// and the surface are moved onto the thread and only touched there.
pub struct RenderSession {
    id: SessionId,
    size: SurfaceSize,
    shared: Arc<Shared>,
    signals: Sender<Signal>,
    exited: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl RenderSession {
    /// Spawn the session thread. It initializes the renderer right away but
    /// does not issue frames until [`resume_rendering`](Self::resume_rendering).
    pub fn start<R: NativeRenderer>(
        renderer: R,
        surface: R::Surface,
        size: SurfaceSize,
        config: SessionConfig,
    ) -> Result<Self, SessionFailure> {
        let id = SessionId::new();
        let shared = Arc::new(Shared::new());
        let (signal_tx, signal_rx) = bounded(SIGNAL_CAPACITY);
        // Never sent on: the sender is dropped when the thread ends, which
        // is what `join` waits for.
        let (exit_tx, exit_rx) = bounded::<()>(0);

        let worker = Worker {
            id,
            size,
            handle: NativeHandle::new(renderer),
            surface,
            shared: Arc::clone(&shared),
            signals: signal_rx,
            config,
        };

        let thread = thread::Builder::new()
            .name(format!("wallspace-render-{}", id.short()))
            .spawn(move || {
                let _exit = exit_tx;
                worker.run();
            })
            .map_err(|e| SessionFailure::Spawn(e.to_string()))?;

        tracing::info!(session = %id, %size, "render session started");

        Ok(Self {
            id,
            size,
            shared,
            signals: signal_tx,
            exited: exit_rx,
            thread: Some(thread),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    pub fn is_rendering(&self) -> bool {
        self.shared.is_rendering()
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.shared.frames.load(Ordering::Acquire)
    }

    /// Whether the session thread has exited.
    pub fn is_finished(&self) -> bool {
        matches!(self.exited.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Set the rendering intent. Idempotent and non-blocking.
    ///
    /// Only the paused → rendering edge wakes the thread; a resume while
    /// already rendering leaves frame pacing alone.
    pub fn resume_rendering(&self) {
        if !self.shared.is_running() {
            return;
        }
        let was_rendering = self.shared.rendering.swap(true, Ordering::AcqRel);
        // A stop that landed after the check above must win.
        if !self.shared.is_running() {
            self.shared.rendering.store(false, Ordering::Release);
            return;
        }
        if !was_rendering {
            tracing::debug!(session = %self.id, "rendering resumed");
            self.wake();
        }
    }

    /// Clear the rendering intent. Idempotent and non-blocking.
    pub fn pause_rendering(&self) {
        if self.shared.rendering.swap(false, Ordering::AcqRel) {
            tracing::debug!(session = %self.id, "rendering paused");
        }
    }

    /// Queue a pointer sample for the renderer. Returns false if it was
    /// dropped because the session is stopping or the queue is full.
    pub fn send_pointer(&self, sample: PointerSample) -> bool {
        if !self.shared.is_running() {
            return false;
        }
        match self.signals.try_send(Signal::Pointer(sample)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!(session = %self.id, "pointer queue full, sample dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Ask the thread to exit without waiting for it.
    pub fn request_stop(&self) {
        let was_running = self.shared.running.swap(false, Ordering::AcqRel);
        self.shared.rendering.store(false, Ordering::Release);
        self.shared.state.advance(SessionState::Stopping);
        self.wake();
        if was_running {
            tracing::debug!(session = %self.id, "stop requested");
        }
    }

    /// Wait up to `timeout` for the thread to exit.
    ///
    /// Safe to call repeatedly. On timeout the thread is left running;
    /// it has already been told to stop and will exit on its own once the
    /// native call it is stuck in returns.
    pub fn join(&mut self, timeout: Duration) -> StopOutcome {
        let started = Instant::now();
        match self.exited.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                let waited = started.elapsed();
                let failure = SessionFailure::TeardownTimeout { waited };
                tracing::error!(session = %self.id, "{failure}");
                StopOutcome::TimedOut { waited }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(thread) = self.thread.take() {
                    if thread.join().is_err() {
                        tracing::error!(session = %self.id, "render thread panicked");
                    }
                }
                StopOutcome::Stopped(self.report())
            }
        }
    }

    /// Request stop, then wait up to `timeout` for the thread to exit.
    pub fn stop(&mut self, timeout: Duration) -> StopOutcome {
        self.request_stop();
        self.join(timeout)
    }

    /// Current account of the session. Final once the thread has exited.
    pub fn report(&self) -> SessionReport {
        SessionReport {
            id: self.id,
            size: self.size,
            state: self.state(),
            frames: self.frames_rendered(),
            failure: self.shared.failure.lock().clone(),
        }
    }

    fn wake(&self) {
        // A full queue already holds something that will wake the thread.
        let _ = self.signals.try_send(Signal::Wake);
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if self.is_finished() {
            return;
        }
        self.request_stop();
        tracing::warn!(session = %self.id, "render session dropped while running, detaching thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallspace_input::PointerPhase;
    use wallspace_tools::{CallJournal, NativeCall, RecordingRenderer, RendererScript, SurfaceToken};

    const SIZE: SurfaceSize = SurfaceSize::new(1080, 1920);
    const WAIT: Duration = Duration::from_secs(5);

    fn fast_config() -> SessionConfig {
        SessionConfig {
            idle_quantum: Duration::from_millis(5),
            frame_interval: Some(Duration::from_millis(2)),
        }
    }

    fn start(journal: &CallJournal, script: RendererScript) -> RenderSession {
        RenderSession::start(
            RecordingRenderer::new(journal, script),
            SurfaceToken(1),
            SIZE,
            fast_config(),
        )
        .unwrap()
    }

    fn renders(journal: &CallJournal, n: usize) -> bool {
        journal.wait_until(WAIT, |e| {
            e.iter()
                .filter(|e| matches!(e.call, NativeCall::Render { .. }))
                .count()
                >= n
        })
    }

    #[test]
    fn renders_after_resume_then_destroys_once() {
        let journal = CallJournal::new();
        let mut session = start(&journal, RendererScript::default());
        session.resume_rendering();
        assert!(renders(&journal, 5));

        let outcome = session.stop(WAIT);
        let report = outcome.report().expect("session stopped");
        assert_eq!(report.state, SessionState::Stopped);
        assert!(report.failure.is_none());
        assert!(report.frames >= 5);

        assert_eq!(journal.init_count(), 1);
        assert_eq!(journal.destroy_count(), 1);
        let init = journal.first_seq(1, |c| matches!(c, NativeCall::Init { .. }));
        let last_render = journal.last_seq(1, |c| matches!(c, NativeCall::Render { .. }));
        let destroy = journal.first_seq(1, |c| *c == NativeCall::Destroy);
        assert!(init < last_render && last_render < destroy);
        assert!(journal.check_exclusive().is_ok());
    }

    #[test]
    fn no_frames_without_rendering_intent() {
        let journal = CallJournal::new();
        let mut session = start(&journal, RendererScript::default());
        assert!(journal.wait_until(WAIT, |e| !e.is_empty()));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(journal.render_count(), 0);
        assert_eq!(session.state(), SessionState::Paused);
        assert!(session.stop(WAIT).is_stopped());
        assert_eq!(journal.destroy_count(), 1);
    }

    #[test]
    fn init_failure_never_renders_or_destroys() {
        let journal = CallJournal::new();
        let mut session = start(&journal, RendererScript::failing_init());
        session.resume_rendering();

        assert!(journal.wait_until(WAIT, |e| e.iter().any(|e| e.call == NativeCall::InitFailed)));
        let outcome = session.join(WAIT);
        let report = outcome.report().expect("thread exits on its own");
        assert_eq!(report.state, SessionState::Stopped);
        assert!(matches!(report.failure, Some(SessionFailure::Initialization(_))));
        assert_eq!(journal.render_count(), 0);
        assert_eq!(journal.destroy_count(), 0);
    }

    #[test]
    fn init_panic_is_contained() {
        let journal = CallJournal::new();
        let mut session = start(
            &journal,
            RendererScript {
                panic_on_init: true,
                ..RendererScript::default()
            },
        );
        let report = session.join(WAIT).report().cloned().expect("stopped");
        assert!(matches!(report.failure, Some(SessionFailure::Initialization(_))));
        assert_eq!(journal.destroy_count(), 0);
    }

    #[test]
    fn render_failure_ends_loop_and_still_destroys() {
        let journal = CallJournal::new();
        let mut session = start(&journal, RendererScript::default().fail_render_after(3));
        session.resume_rendering();

        let report = session.join(WAIT).report().cloned().expect("stopped");
        assert_eq!(report.frames, 3);
        assert!(matches!(report.failure, Some(SessionFailure::Render { frame: 4, .. })));
        assert_eq!(journal.render_count(), 3);
        assert_eq!(journal.destroy_count(), 1);
    }

    #[test]
    fn renderer_quit_is_a_clean_stop() {
        let journal = CallJournal::new();
        let mut session = start(&journal, RendererScript::default().quit_after(2));
        session.resume_rendering();

        let report = session.join(WAIT).report().cloned().expect("stopped");
        assert!(report.failure.is_none());
        assert_eq!(report.frames, 2);
        assert_eq!(journal.destroy_count(), 1);
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let journal = CallJournal::new();
        let mut session = start(&journal, RendererScript::default());
        session.resume_rendering();
        session.resume_rendering();
        session.resume_rendering();
        assert!(session.is_rendering());
        session.pause_rendering();
        session.pause_rendering();
        assert!(!session.is_rendering());
        session.resume_rendering();
        assert!(session.is_rendering());
        session.stop(WAIT);
    }

    #[test]
    fn stop_is_prompt_while_paused() {
        let journal = CallJournal::new();
        let mut session = RenderSession::start(
            RecordingRenderer::new(&journal, RendererScript::default()),
            SurfaceToken(1),
            SIZE,
            SessionConfig {
                idle_quantum: Duration::from_secs(30),
                frame_interval: None,
            },
        )
        .unwrap();
        assert!(journal.wait_until(WAIT, |e| !e.is_empty()));

        let started = Instant::now();
        assert!(session.stop(WAIT).is_stopped());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn stop_enters_stopping_immediately() {
        let journal = CallJournal::new();
        let mut session = start(
            &journal,
            RendererScript::default().destroy_delay(Duration::from_millis(100)),
        );
        session.resume_rendering();
        assert!(renders(&journal, 1));

        session.request_stop();
        assert!(matches!(
            session.state(),
            SessionState::Stopping | SessionState::Stopped
        ));
        assert!(!session.is_rendering());
        assert!(!session.is_running());
        assert!(session.join(WAIT).is_stopped());
    }

    #[test]
    fn join_times_out_on_hung_teardown() {
        let journal = CallJournal::new();
        let mut session = start(
            &journal,
            RendererScript::default().destroy_delay(Duration::from_millis(300)),
        );
        session.resume_rendering();
        assert!(renders(&journal, 1));

        let outcome = session.stop(Duration::from_millis(20));
        assert!(matches!(outcome, StopOutcome::TimedOut { .. }));
        assert!(!session.is_rendering());

        assert!(session.join(WAIT).is_stopped());
        assert_eq!(journal.destroy_count(), 1);
    }

    #[test]
    fn pointer_samples_reach_the_renderer() {
        let journal = CallJournal::new();
        let mut session = start(&journal, RendererScript::default());
        session.resume_rendering();
        assert!(renders(&journal, 1));

        assert!(session.send_pointer(PointerSample::classify(10.0, 20.0, PointerPhase::Down)));
        assert!(journal.wait_until(WAIT, |e| {
            e.iter().any(|e| {
                e.call
                    == NativeCall::Pointer {
                        x: 10.0,
                        y: 20.0,
                        pressed: true,
                    }
            })
        }));

        session.stop(WAIT);
        assert!(!session.send_pointer(PointerSample::classify(1.0, 1.0, PointerPhase::Up)));
    }

    #[test]
    fn repeated_resume_keeps_the_frame_cap() {
        let journal = CallJournal::new();
        let mut session = RenderSession::start(
            RecordingRenderer::new(&journal, RendererScript::default()),
            SurfaceToken(1),
            SIZE,
            SessionConfig {
                idle_quantum: Duration::from_millis(5),
                frame_interval: Some(Duration::from_millis(100)),
            },
        )
        .unwrap();
        session.resume_rendering();
        assert!(renders(&journal, 1));

        let started = Instant::now();
        let before = journal.render_count();
        while started.elapsed() < Duration::from_millis(500) {
            session.resume_rendering();
            thread::sleep(Duration::from_millis(2));
        }
        let rendered = journal.render_count() - before;
        session.stop(WAIT);

        // 10 fps over 500ms, with slack for scheduling.
        assert!(rendered <= 8, "{rendered} frames past a 10 fps cap");
    }

    #[test]
    fn resume_racing_stop_never_leaves_rendering_set() {
        for _ in 0..20 {
            let journal = CallJournal::new();
            let session = Arc::new(start(&journal, RendererScript::default()));
            let resumer = {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    for _ in 0..200 {
                        session.resume_rendering();
                    }
                })
            };
            session.request_stop();
            resumer.join().unwrap();
            assert!(!session.is_rendering());
            assert!(!session.is_running());
        }
    }

    #[test]
    fn resume_after_stop_is_ignored() {
        let journal = CallJournal::new();
        let mut session = start(&journal, RendererScript::default());
        session.stop(WAIT);
        session.resume_rendering();
        assert!(!session.is_rendering());
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[test]
    fn dropping_a_running_session_stops_it() {
        let journal = CallJournal::new();
        let session = start(&journal, RendererScript::default());
        session.resume_rendering();
        assert!(renders(&journal, 1));
        drop(session);
        assert!(journal.wait_until(WAIT, |e| e.iter().any(|e| e.call == NativeCall::Destroy)));
    }
}
