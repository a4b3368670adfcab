use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use wallspace_common::SurfaceSize;
use wallspace_input::PointerSample;

use crate::renderer::{FrameStatus, NativeRenderer, RenderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleState {
    Fresh,
    Live,
    Failed,
    Destroyed,
}

/// Owns one native renderer and enforces its lifecycle contract.
///
/// Every native call is wrapped in `catch_unwind`, so a panicking engine
/// surfaces as a [`RenderError::Panicked`] instead of unwinding through the
/// session thread.
pub struct NativeHandle<R: NativeRenderer> {
    renderer: R,
    state: HandleState,
    frames: u64,
}

impl<R: NativeRenderer> NativeHandle<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            state: HandleState::Fresh,
            frames: 0,
        }
    }

    /// Run the native init. Allowed once; a failure leaves the handle dead.
    pub fn init(&mut self, surface: &R::Surface, size: SurfaceSize) -> Result<(), RenderError> {
        match self.state {
            HandleState::Fresh => {}
            HandleState::Destroyed => return Err(RenderError::Destroyed),
            HandleState::Live | HandleState::Failed => return Err(RenderError::AlreadyInitialized),
        }

        let renderer = &mut self.renderer;
        let result = guarded("init", || renderer.init(surface, size));
        self.state = if result.is_ok() {
            HandleState::Live
        } else {
            HandleState::Failed
        };
        result
    }

    /// Run one native frame. Only valid between `init` and `destroy`.
    pub fn render(&mut self) -> Result<FrameStatus, RenderError> {
        self.ensure_live()?;
        let renderer = &mut self.renderer;
        let status = guarded("render", || renderer.render())?;
        self.frames += 1;
        Ok(status)
    }

    /// Forward a pointer sample. Dropped unless the renderer is live.
    pub fn pointer_event(&mut self, sample: PointerSample) -> bool {
        if self.state != HandleState::Live {
            tracing::trace!("pointer sample dropped: renderer not live");
            return false;
        }
        let renderer = &mut self.renderer;
        let delivered = guarded("pointer_event", || {
            renderer.pointer_event(sample.x, sample.y, sample.pressed);
            Ok(())
        });
        if let Err(e) = delivered {
            tracing::warn!("{e}");
            return false;
        }
        true
    }

    /// Run the native destroy.
    ///
    /// Returns `NotInitialized` without touching the engine when `init`
    /// never succeeded, and `Destroyed` on a second call. A panic inside the
    /// engine's destroy is reported but the handle is still considered
    /// released; there is nothing safe left to retry.
    pub fn destroy(&mut self) -> Result<(), RenderError> {
        match self.state {
            HandleState::Live => {}
            HandleState::Fresh | HandleState::Failed => return Err(RenderError::NotInitialized),
            HandleState::Destroyed => return Err(RenderError::Destroyed),
        }

        self.state = HandleState::Destroyed;
        let renderer = &mut self.renderer;
        guarded("destroy", || {
            renderer.destroy();
            Ok(())
        })
    }

    pub fn is_live(&self) -> bool {
        self.state == HandleState::Live
    }

    /// Frames successfully rendered through this handle.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    fn ensure_live(&self) -> Result<(), RenderError> {
        match self.state {
            HandleState::Live => Ok(()),
            HandleState::Destroyed => Err(RenderError::Destroyed),
            HandleState::Fresh | HandleState::Failed => Err(RenderError::NotInitialized),
        }
    }
}

fn guarded<T>(
    call: &'static str,
    f: impl FnOnce() -> Result<T, RenderError>,
) -> Result<T, RenderError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(RenderError::Panicked {
            call,
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
