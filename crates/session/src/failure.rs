use std::fmt;
use std::time::Duration;

use wallspace_common::{SessionId, SurfaceSize};
use wallspace_render::RenderError;

use crate::state::SessionState;

/// Everything that can go wrong inside a render session.
///
/// None of these reach the controller as an error: they are logged where
/// they happen and carried in the [`SessionReport`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionFailure {
    #[error("initialization failed: {0}")]
    Initialization(#[source] RenderError),
    #[error("frame {frame} failed: {source}")]
    Render {
        frame: u64,
        #[source]
        source: RenderError,
    },
    #[error("session thread did not exit within {waited:?}")]
    TeardownTimeout { waited: Duration },
    #[error("destroy skipped: renderer never completed init")]
    UnexpectedDestroy,
    #[error("could not spawn render thread: {0}")]
    Spawn(String),
}

/// Final account of one session, produced once its thread has exited.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub id: SessionId,
    pub size: SurfaceSize,
    pub state: SessionState,
    pub frames: u64,
    pub failure: Option<SessionFailure>,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session {} ({}) {} after {} frames",
            self.id, self.size, self.state, self.frames
        )?;
        if let Some(failure) = &self.failure {
            write!(f, ": {failure}")?;
        }
        Ok(())
    }
}

/// Result of waiting for a session thread to exit.
#[derive(Debug, Clone, PartialEq)]
pub enum StopOutcome {
    /// The thread exited; the native renderer is released.
    Stopped(SessionReport),
    /// The bound elapsed first. The thread may still be inside a native call.
    TimedOut { waited: Duration },
}

impl StopOutcome {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped(_))
    }

    pub fn report(&self) -> Option<&SessionReport> {
        match self {
            Self::Stopped(report) => Some(report),
            Self::TimedOut { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_display_includes_failure() {
        let report = SessionReport {
            id: SessionId::new(),
            size: SurfaceSize::new(1080, 1920),
            state: SessionState::Stopped,
            frames: 0,
            failure: Some(SessionFailure::Initialization(RenderError::InitFailed(
                "no egl".into(),
            ))),
        };
        let text = report.to_string();
        assert!(text.contains("1080x1920"));
        assert!(text.contains("stopped after 0 frames"));
        assert!(text.contains("no egl"));
    }

    #[test]
    fn timeout_has_no_report() {
        let outcome = StopOutcome::TimedOut {
            waited: Duration::from_secs(2),
        };
        assert!(!outcome.is_stopped());
        assert!(outcome.report().is_none());
    }
}
