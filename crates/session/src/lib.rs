//! Render Session: one background thread bound to one surface instance.
//!
//! # Invariants
//! - Native `init` runs at most once, before any `render`.
//! - Native `destroy` runs exactly once iff `init` succeeded, after the last
//!   `render`, on the session's own thread.
//! - `Stopping` is entered as soon as a stop is requested and is left only
//!   for `Stopped`, which is terminal.
//! - No failure inside the session escapes as a panic or error to the caller.

mod failure;
mod session;
mod state;
mod worker;

pub use failure::{SessionFailure, SessionReport, StopOutcome};
pub use session::{RenderSession, SessionConfig};
pub use state::SessionState;
