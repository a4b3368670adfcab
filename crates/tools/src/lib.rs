//! Developer Tooling: a recording renderer and the journal it writes to.
//!
//! # Invariants
//! - Journal entries are totally ordered by `seq`, across all renderers.
//! - Tools observe native calls; they never drive the lifecycle themselves.

pub mod journal;
pub mod recording;

pub use journal::{CallJournal, ExclusivityViolation, JournalEntry, JournalSummary, NativeCall};
pub use recording::{RecordingRenderer, RendererScript, SurfaceToken};

pub fn crate_info() -> &'static str {
    "wallspace-tools v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("tools"));
    }
}
