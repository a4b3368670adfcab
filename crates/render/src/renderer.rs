use wallspace_common::SurfaceSize;

/// Errors raised by a native renderer or by the guard around it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("native init failed: {0}")]
    InitFailed(String),
    #[error("native frame failed: {0}")]
    FrameFailed(String),
    #[error("native {call} panicked: {message}")]
    Panicked { call: &'static str, message: String },
    #[error("renderer already initialized")]
    AlreadyInitialized,
    #[error("renderer never completed init")]
    NotInitialized,
    #[error("renderer already destroyed")]
    Destroyed,
}

/// What the renderer wants after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Keep issuing frames.
    Continue,
    /// The engine raised its own quit flag; further frames would be no-ops.
    Quit,
}

/// The native rendering engine's lifecycle contract.
///
/// One value is one per-session engine instance. It is created on the
/// controller side, moved onto the session thread and only touched there,
/// so implementations need `Send` but never `Sync`.
pub trait NativeRenderer: Send + 'static {
    /// Platform surface handle the engine draws into.
    type Surface: Send + 'static;

    /// Create the engine's resources against `surface`.
    fn init(&mut self, surface: &Self::Surface, size: SurfaceSize) -> Result<(), RenderError>;

    /// Advance and present one frame.
    fn render(&mut self) -> Result<FrameStatus, RenderError>;

    /// Release everything `init` created.
    fn destroy(&mut self);

    /// Feed one pointer sample. Fire-and-forget.
    fn pointer_event(&mut self, x: f32, y: f32, pressed: bool);
}

/// Produces one fresh renderer per render session.
pub trait RendererFactory: Send + Sync + 'static {
    type Renderer: NativeRenderer;

    fn create(&self) -> Self::Renderer;
}

impl<F, R> RendererFactory for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: NativeRenderer,
{
    type Renderer = R;

    fn create(&self) -> R {
        self()
    }
}
