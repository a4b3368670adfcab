use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a render session.
///
/// `Starting → Initialized → {Rendering ⇄ Paused} → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    Starting = 0,
    Initialized = 1,
    Rendering = 2,
    Paused = 3,
    Stopping = 4,
    Stopped = 5,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Starting,
            1 => Self::Initialized,
            2 => Self::Rendering,
            3 => Self::Paused,
            4 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    /// Whether `self → to` is a legal edge of the state machine.
    pub fn can_advance_to(self, to: SessionState) -> bool {
        use SessionState::*;
        match (self, to) {
            (Stopped, _) => false,
            (_, Stopped) => true,
            (Stopping, _) => false,
            (_, Stopping) => true,
            (Starting, Initialized) => true,
            (Initialized | Paused, Rendering) => true,
            (Initialized | Rendering, Paused) => true,
            (from, to) => from == to,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Stopped
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Initialized => "initialized",
            Self::Rendering => "rendering",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Atomic holder for a [`SessionState`], written from both the controller
/// side (`Stopping`) and the session thread (everything else).
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionState::Starting as u8))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `to` if the edge is legal. Returns whether the state changed.
    pub(crate) fn advance(&self, to: SessionState) -> bool {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                let from = SessionState::from_u8(raw);
                (from != to && from.can_advance_to(to)).then_some(to as u8)
            })
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::SessionState::*;
    use super::*;

    #[test]
    fn happy_path_edges() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), Starting);
        assert!(cell.advance(Initialized));
        assert!(cell.advance(Rendering));
        assert!(cell.advance(Paused));
        assert!(cell.advance(Rendering));
        assert!(cell.advance(Stopping));
        assert!(cell.advance(Stopped));
        assert!(cell.get().is_terminal());
    }

    #[test]
    fn stopping_only_leads_to_stopped() {
        let cell = StateCell::new();
        cell.advance(Initialized);
        cell.advance(Stopping);
        assert!(!cell.advance(Rendering));
        assert!(!cell.advance(Paused));
        assert_eq!(cell.get(), Stopping);
        assert!(cell.advance(Stopped));
    }

    #[test]
    fn stopped_is_terminal() {
        let cell = StateCell::new();
        cell.advance(Stopped);
        for to in [Starting, Initialized, Rendering, Paused, Stopping] {
            assert!(!cell.advance(to));
        }
        assert_eq!(cell.get(), Stopped);
    }

    #[test]
    fn cannot_render_before_init() {
        assert!(!Starting.can_advance_to(Rendering));
        assert!(!Starting.can_advance_to(Paused));
        assert!(Starting.can_advance_to(Stopping));
    }

    #[test]
    fn repeated_advance_reports_no_change() {
        let cell = StateCell::new();
        cell.advance(Initialized);
        assert!(cell.advance(Paused));
        assert!(!cell.advance(Paused));
    }
}
