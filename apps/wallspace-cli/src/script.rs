use std::fmt;
use std::time::Duration;

use wallspace_common::{SizeParseError, SurfaceSize};
use wallspace_input::PointerPhase;

/// One platform event in a lifecycle script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptEvent {
    Available(SurfaceSize),
    Changed(SurfaceSize),
    Lost,
    Visible(bool),
    Pointer { x: f32, y: f32, phase: PointerPhase },
    Wait(Duration),
    Shutdown,
}

impl fmt::Display for ScriptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(size) => write!(f, "available:{size}"),
            Self::Changed(size) => write!(f, "changed:{size}"),
            Self::Lost => f.write_str("lost"),
            Self::Visible(v) => write!(f, "visible:{v}"),
            Self::Pointer { x, y, phase } => write!(f, "pointer:{x},{y},{phase}"),
            Self::Wait(d) => write!(f, "wait:{}", d.as_millis()),
            Self::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Errors from parsing a lifecycle script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("event {index}: unknown event {name:?}")]
    UnknownEvent { index: usize, name: String },
    #[error("event {index}: {name} needs an argument")]
    MissingArgument { index: usize, name: String },
    #[error("event {index}: {source}")]
    Size {
        index: usize,
        #[source]
        source: SizeParseError,
    },
    #[error("event {index}: invalid argument {arg:?}: {reason}")]
    InvalidArgument {
        index: usize,
        arg: String,
        reason: String,
    },
    #[error("script is empty")]
    Empty,
}

/// Parse `;`-separated events, e.g.
/// `available:1080x1920; visible:false; pointer:10,20,down; lost; shutdown`.
pub fn parse_script(script: &str) -> Result<Vec<ScriptEvent>, ScriptError> {
    let events = script
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(index, raw)| parse_event(index, raw))
        .collect::<Result<Vec<_>, _>>()?;
    if events.is_empty() {
        return Err(ScriptError::Empty);
    }
    Ok(events)
}

fn parse_event(index: usize, raw: &str) -> Result<ScriptEvent, ScriptError> {
    let (name, arg) = match raw.split_once(':') {
        Some((name, arg)) => (name.trim(), Some(arg.trim())),
        None => (raw, None),
    };
    let require = || {
        arg.ok_or_else(|| ScriptError::MissingArgument {
            index,
            name: name.to_string(),
        })
    };
    let invalid = |arg: &str, reason: String| ScriptError::InvalidArgument {
        index,
        arg: arg.to_string(),
        reason,
    };

    match name {
        "available" | "changed" => {
            let size = require()?
                .parse::<SurfaceSize>()
                .map_err(|source| ScriptError::Size { index, source })?;
            Ok(if name == "available" {
                ScriptEvent::Available(size)
            } else {
                ScriptEvent::Changed(size)
            })
        }
        "lost" => Ok(ScriptEvent::Lost),
        "shutdown" => Ok(ScriptEvent::Shutdown),
        "visible" => {
            let arg = require()?;
            arg.parse::<bool>()
                .map(ScriptEvent::Visible)
                .map_err(|e| invalid(arg, e.to_string()))
        }
        "wait" => {
            let arg = require()?;
            arg.parse::<u64>()
                .map(|ms| ScriptEvent::Wait(Duration::from_millis(ms)))
                .map_err(|e| invalid(arg, e.to_string()))
        }
        "pointer" => {
            let arg = require()?;
            let parts: Vec<&str> = arg.split(',').map(str::trim).collect();
            let [x, y, phase] = parts.as_slice() else {
                return Err(invalid(arg, "expected X,Y,PHASE".into()));
            };
            let coord = |s: &str| s.parse::<f32>().map_err(|e| invalid(s, e.to_string()));
            Ok(ScriptEvent::Pointer {
                x: coord(*x)?,
                y: coord(*y)?,
                phase: phase.parse().map_err(|e| invalid(*phase, e))?,
            })
        }
        other => Err(ScriptError::UnknownEvent {
            index,
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_script() {
        let events = parse_script(
            "available:1080x1920; visible:false; pointer:10,20.5,down; wait:30; changed:1920x1080; lost; shutdown",
        )
        .unwrap();
        assert_eq!(
            events,
            vec![
                ScriptEvent::Available(SurfaceSize::new(1080, 1920)),
                ScriptEvent::Visible(false),
                ScriptEvent::Pointer {
                    x: 10.0,
                    y: 20.5,
                    phase: PointerPhase::Down
                },
                ScriptEvent::Wait(Duration::from_millis(30)),
                ScriptEvent::Changed(SurfaceSize::new(1920, 1080)),
                ScriptEvent::Lost,
                ScriptEvent::Shutdown,
            ]
        );
    }

    #[test]
    fn trailing_separators_are_ignored() {
        assert_eq!(parse_script("lost;;").unwrap(), vec![ScriptEvent::Lost]);
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(parse_script(" ; "), Err(ScriptError::Empty)));
    }

    #[test]
    fn errors_name_the_event_index() {
        let err = parse_script("lost; explode").unwrap_err();
        assert!(matches!(err, ScriptError::UnknownEvent { index: 1, .. }));

        let err = parse_script("available").unwrap_err();
        assert!(matches!(err, ScriptError::MissingArgument { index: 0, .. }));

        let err = parse_script("changed:12").unwrap_err();
        assert!(matches!(err, ScriptError::Size { index: 0, .. }));

        let err = parse_script("pointer:1,2").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidArgument { .. }));

        let err = parse_script("pointer:1,2,tap").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidArgument { .. }));
    }

    #[test]
    fn display_matches_the_grammar() {
        for raw in ["available:10x20", "visible:true", "wait:5", "lost", "shutdown"] {
            let events = parse_script(raw).unwrap();
            assert_eq!(events[0].to_string(), raw);
        }
    }
}
