//! Native renderer adapter: the four-call lifecycle contract.
//!
//! # Invariants
//! - `init` runs at most once per renderer, strictly before any `render`.
//! - `destroy` runs at most once, and only after a successful `init`.
//! - Panics raised by native calls never cross the adapter boundary.
//!
//! The drawing itself is opaque here. Hosts implement [`NativeRenderer`]
//! and hand the lifecycle controller a [`RendererFactory`].

mod handle;
mod library;
mod renderer;

pub use handle::NativeHandle;
pub use library::{LibraryGuard, LibraryInfo, load_native_library, native_library};
pub use renderer::{FrameStatus, NativeRenderer, RenderError, RendererFactory};

pub fn crate_info() -> &'static str {
    "wallspace-render v0.1.0"
}
