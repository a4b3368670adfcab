use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for one render session (one surface binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, used in thread names and log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

/// Pixel dimensions of a drawable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A surface with no drawable area in at least one dimension.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Errors from parsing a `WIDTHxHEIGHT` size string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SizeParseError {
    #[error("expected WIDTHxHEIGHT, got {0:?}")]
    MissingSeparator(String),
    #[error("invalid dimension {0:?}")]
    InvalidDimension(String),
}

impl FromStr for SurfaceSize {
    type Err = SizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| SizeParseError::MissingSeparator(s.to_string()))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| SizeParseError::InvalidDimension(part.to_string()))
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_uniqueness() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn session_id_short_form() {
        let id = SessionId::new();
        assert_eq!(id.short().len(), 8);
        assert_eq!(id.to_string(), id.short());
    }

    #[test]
    fn size_parse_and_display() {
        let size: SurfaceSize = "1080x1920".parse().unwrap();
        assert_eq!(size, SurfaceSize::new(1080, 1920));
        assert_eq!(size.to_string(), "1080x1920");
        assert!(!size.is_empty());
    }

    #[test]
    fn size_parse_rejects_garbage() {
        assert!(matches!(
            "1080".parse::<SurfaceSize>(),
            Err(SizeParseError::MissingSeparator(_))
        ));
        assert!(matches!(
            "axb".parse::<SurfaceSize>(),
            Err(SizeParseError::InvalidDimension(_))
        ));
    }

    #[test]
    fn zero_dimension_is_empty() {
        assert!(SurfaceSize::new(0, 100).is_empty());
        assert!(SurfaceSize::new(100, 0).is_empty());
    }
}
