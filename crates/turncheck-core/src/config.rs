//! Configuration types for turncheck.
//!
//! Loaded from `turncheck.yml`. Every field has a default, so an empty file
//! (or no file at all) yields a working configuration pointed at a local
//! Rasa-compatible server.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurncheckConfig {
    /// How to reach the conversational runtime.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// How utterances are delivered during simulation.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Suppress all warnings (for CI environments).
    #[serde(default, rename = "_suppress_warnings")]
    pub suppress_warnings: bool,
}

impl TurncheckConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        debug!(path = %path_ref.display(), "Loading configuration from file");
        let content = std::fs::read_to_string(path_ref)?;
        Self::parse_yaml(&content)
    }

    /// Parses configuration from a YAML string.
    pub fn parse_yaml(content: &str) -> Result<Self, ConfigError> {
        // serde_yaml reads an empty document as null, not as an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        debug!(
            url = %config.runtime.url,
            delivery_timeout_secs = config.simulation.delivery_timeout_secs,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validates the configuration and returns warnings.
    ///
    /// Errors on values that make a run impossible; warns on values that
    /// make one behave surprisingly.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let mut warnings = Vec::new();

        if self.runtime.url.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                field: "runtime.url".to_string(),
            });
        }

        if self.simulation.delivery_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "simulation.delivery_timeout_secs".to_string(),
            });
        }

        if self.runtime.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout {
                field: "runtime.request_timeout_secs".to_string(),
            });
        }

        if self.suppress_warnings {
            return Ok(warnings);
        }

        // One delivery issues two requests, so a shorter delivery deadline
        // cuts requests off before their own timeout fires.
        if self.simulation.delivery_timeout_secs < self.runtime.request_timeout_secs {
            warnings.push(ConfigWarning::InvalidValue {
                field: "simulation.delivery_timeout_secs".to_string(),
                message: format!(
                    "shorter than runtime.request_timeout_secs ({}s); slow requests will be reported as timeouts",
                    self.runtime.request_timeout_secs
                ),
            });
        }

        if self.simulation.session_prefix.trim().is_empty() {
            warnings.push(ConfigWarning::InvalidValue {
                field: "simulation.session_prefix".to_string(),
                message: "empty prefix; session ids will be bare timestamps".to_string(),
            });
        }

        Ok(warnings)
    }
}

/// Conversational runtime connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base URL of the Rasa-compatible server.
    #[serde(default = "default_url")]
    pub url: String,

    /// Name of the REST webhook channel (`/webhooks/{channel}/webhook`).
    #[serde(default = "default_webhook_channel")]
    pub webhook_channel: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_url() -> String {
    "http://localhost:5005".to_string()
}

fn default_webhook_channel() -> String {
    "rest".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            webhook_channel: default_webhook_channel(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl RuntimeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Prefix of the per-test-case conversation session id.
    #[serde(default = "default_session_prefix")]
    pub session_prefix: String,

    /// Channel name the delivered messages are attributed to.
    #[serde(default = "default_input_channel")]
    pub input_channel: String,

    /// Deadline for handling one utterance, in seconds.
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,
}

fn default_session_prefix() -> String {
    "botfront_test_case".to_string()
}

fn default_input_channel() -> String {
    "test_case".to_string()
}

fn default_delivery_timeout() -> u64 {
    60
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            session_prefix: default_session_prefix(),
            input_channel: default_input_channel(),
            delivery_timeout_secs: default_delivery_timeout(),
        }
    }
}

impl SimulationConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

/// Configuration warnings emitted during validation.
#[derive(Debug, Clone)]
pub enum ConfigWarning {
    /// Field has a value that works but is probably not intended.
    InvalidValue { field: String, message: String },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::InvalidValue { field, message } => {
                write!(f, "Warning [{field}]: {message}")
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Field '{field}' must not be empty")]
    EmptyField { field: String },

    #[error("Timeout '{field}' must be greater than zero")]
    ZeroTimeout { field: String },
}
