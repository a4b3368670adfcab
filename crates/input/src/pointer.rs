use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Phase of a platform pointer event, as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Initial contact.
    Down,
    /// Movement while in contact.
    Move,
    /// Contact released.
    Up,
    /// Gesture cancelled by the platform.
    Cancel,
}

impl PointerPhase {
    /// Press-or-drag classification: true on contact and on movement in contact.
    pub fn is_pressed(self) -> bool {
        matches!(self, Self::Down | Self::Move)
    }
}

impl fmt::Display for PointerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Down => "down",
            Self::Move => "move",
            Self::Up => "up",
            Self::Cancel => "cancel",
        };
        f.write_str(name)
    }
}

impl FromStr for PointerPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "down" => Ok(Self::Down),
            "move" => Ok(Self::Move),
            "up" => Ok(Self::Up),
            "cancel" => Ok(Self::Cancel),
            other => Err(format!("unknown pointer phase {other:?}")),
        }
    }
}

/// A pointer sample in the shape the native renderer consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
    pub pressed: bool,
}

impl PointerSample {
    /// Build a sample from a raw platform event.
    pub fn classify(x: f32, y: f32, phase: PointerPhase) -> Self {
        let sample = Self {
            x,
            y,
            pressed: phase.is_pressed(),
        };
        tracing::trace!(x, y, %phase, pressed = sample.pressed, "pointer classified");
        sample
    }
}
