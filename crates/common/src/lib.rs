//! Shared types for the wallspace render lifecycle.

mod types;

pub use types::{SessionId, SizeParseError, SurfaceSize};
