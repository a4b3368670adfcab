//! Lifecycle Controller: platform surface events in, render sessions out.
//!
//! # Invariants
//! - At most one session is active, and at most one native renderer is live.
//! - A replacement session starts only after the previous one was joined
//!   (or its bounded wait elapsed) and the settling delay passed.
//! - Every entry point that touches the active session runs under one lock.
//! - Becoming invisible never pauses rendering.

pub mod config;
pub mod controller;

pub use config::{ConfigError, ControllerConfig};
pub use controller::{ControllerStatus, LifecycleController, SessionStatus};

pub fn crate_info() -> &'static str {
    "wallspace-lifecycle v0.1.0"
}
