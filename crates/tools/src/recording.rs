use std::thread;
use std::time::Duration;

use wallspace_common::SurfaceSize;
use wallspace_render::{FrameStatus, NativeRenderer, RenderError};

use crate::journal::{CallJournal, NativeCall};

/// Stand-in for a platform surface: just a number to tell surfaces apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceToken(pub u32);

/// Fault and timing behavior for a [`RecordingRenderer`].
#[derive(Debug, Clone, Default)]
pub struct RendererScript {
    /// `init` returns an error.
    pub fail_init: bool,
    /// `init` panics.
    pub panic_on_init: bool,
    /// Frames that succeed before `render` starts failing.
    pub fail_render_after: Option<u64>,
    /// Frames rendered before the engine asks to quit.
    pub quit_after: Option<u64>,
    /// Time spent inside each `render` call.
    pub render_delay: Duration,
    /// Time spent inside `destroy`, to simulate a slow or hung teardown.
    pub destroy_delay: Duration,
}

impl RendererScript {
    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn fail_render_after(mut self, frames: u64) -> Self {
        self.fail_render_after = Some(frames);
        self
    }

    pub fn quit_after(mut self, frames: u64) -> Self {
        self.quit_after = Some(frames);
        self
    }

    pub fn render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }

    pub fn destroy_delay(mut self, delay: Duration) -> Self {
        self.destroy_delay = delay;
        self
    }
}

/// A [`NativeRenderer`] that draws nothing and journals every call.
pub struct RecordingRenderer {
    id: u32,
    journal: CallJournal,
    script: RendererScript,
    frames: u64,
}

impl RecordingRenderer {
    pub fn new(journal: &CallJournal, script: RendererScript) -> Self {
        Self {
            id: journal.next_renderer_id(),
            journal: journal.clone(),
            script,
            frames: 0,
        }
    }

    /// Position of this renderer in creation order, starting at 1.
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl NativeRenderer for RecordingRenderer {
    type Surface = SurfaceToken;

    fn init(&mut self, surface: &SurfaceToken, size: SurfaceSize) -> Result<(), RenderError> {
        self.journal.record(
            self.id,
            NativeCall::Init {
                surface: surface.0,
                width: size.width,
                height: size.height,
            },
        );
        if self.script.panic_on_init {
            self.journal.record(self.id, NativeCall::InitFailed);
            panic!("scripted init panic");
        }
        if self.script.fail_init {
            self.journal.record(self.id, NativeCall::InitFailed);
            return Err(RenderError::InitFailed("scripted init failure".into()));
        }
        Ok(())
    }

    fn render(&mut self) -> Result<FrameStatus, RenderError> {
        if let Some(limit) = self.script.fail_render_after {
            if self.frames >= limit {
                return Err(RenderError::FrameFailed(format!(
                    "scripted failure after {limit} frames"
                )));
            }
        }
        if !self.script.render_delay.is_zero() {
            thread::sleep(self.script.render_delay);
        }
        self.frames += 1;
        self.journal
            .record(self.id, NativeCall::Render { frame: self.frames });

        match self.script.quit_after {
            Some(limit) if self.frames >= limit => Ok(FrameStatus::Quit),
            _ => Ok(FrameStatus::Continue),
        }
    }

    fn destroy(&mut self) {
        if !self.script.destroy_delay.is_zero() {
            thread::sleep(self.script.destroy_delay);
        }
        self.journal.record(self.id, NativeCall::Destroy);
    }

    fn pointer_event(&mut self, x: f32, y: f32, pressed: bool) {
        self.journal
            .record(self.id, NativeCall::Pointer { x, y, pressed });
    }
}

impl CallJournal {
    /// A renderer factory producing recording renderers with one script.
    pub fn factory(&self, script: RendererScript) -> impl Fn() -> RecordingRenderer + Send + Sync + 'static {
        let journal = self.clone();
        move || RecordingRenderer::new(&journal, script.clone())
    }

    /// A renderer factory choosing a script per renderer number (1-based).
    pub fn factory_with<F>(&self, choose: F) -> impl Fn() -> RecordingRenderer + Send + Sync + 'static
    where
        F: Fn(u32) -> RendererScript + Send + Sync + 'static,
    {
        let journal = self.clone();
        move || {
            let mut renderer = RecordingRenderer::new(&journal, RendererScript::default());
            renderer.script = choose(renderer.id);
            renderer
        }
    }
}
