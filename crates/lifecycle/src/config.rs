//! Controller tuning, loadable from YAML.
//!
//! ```yaml
//! join_timeout_ms: 2000
//! settle_delay_ms: 50
//! idle_quantum_ms: 100
//! max_frame_rate: 60.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use wallspace_session::SessionConfig;

/// Errors from loading or validating a [`ControllerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Timing configuration for the lifecycle controller and its sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Upper bound on waiting for an old session thread to exit.
    pub join_timeout_ms: u64,
    /// Pause between an old session's exit and the next native init, giving
    /// the platform time to finish releasing the previous surface.
    pub settle_delay_ms: u64,
    /// Intent re-check interval of an idle session.
    pub idle_quantum_ms: u64,
    /// Frame pacing cap. `0` disables pacing; the loop only yields.
    pub max_frame_rate: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            join_timeout_ms: 2000,
            settle_delay_ms: 50,
            idle_quantum_ms: 100,
            max_frame_rate: 60.0,
        }
    }
}

impl ControllerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), ?config, "controller config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.join_timeout_ms == 0 {
            return Err(ConfigError::Invalid("join_timeout_ms must be non-zero".into()));
        }
        if self.idle_quantum_ms == 0 {
            return Err(ConfigError::Invalid("idle_quantum_ms must be non-zero".into()));
        }
        if !self.max_frame_rate.is_finite() || self.max_frame_rate < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_frame_rate must be a non-negative number, got {}",
                self.max_frame_rate
            )));
        }
        Ok(())
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        let frame_interval = (self.max_frame_rate > 0.0)
            .then(|| Duration::from_secs_f64(1.0 / self.max_frame_rate));
        SessionConfig {
            idle_quantum: Duration::from_millis(self.idle_quantum_ms),
            frame_interval,
        }
    }
}
