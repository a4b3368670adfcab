//! Pointer input: platform touch/mouse phases mapped to the renderer's input.
//!
//! # Invariants
//! - A sample is `pressed` on initial contact and while dragging in contact.
//! - Release and cancellation always produce an unpressed sample.

pub mod pointer;

pub use pointer::{PointerPhase, PointerSample};
