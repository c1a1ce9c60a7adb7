//! Settings for the interpreter and the Hue bridge
//!
//! ```yaml
//! interpreter:
//!   ack_timeout: 10          # seconds
//!   pause_scope: per_iteration
//! bridge:
//!   address: 192.168.1.20
//!   username: !env_var HUEBOT_USER
//!   request_timeout: 5
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time to wait for a device acknowledgement
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(10);

/// Default HTTP request timeout for the bridge
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a composite step's pause applies when the step loops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseScope {
    /// `before` and `after` bracket every iteration
    #[default]
    PerIteration,
    /// `before` runs once before the first iteration, `after` once after the last
    AroundLoop,
}

/// Interpreter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterpreterConfig {
    /// Upper bound on waiting for a `wait: true` acknowledgement
    #[serde(default = "default_ack_timeout", with = "seconds")]
    pub ack_timeout: Duration,

    #[serde(default)]
    pub pause_scope: PauseScope,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            ack_timeout: DEFAULT_ACK_TIMEOUT,
            pause_scope: PauseScope::default(),
        }
    }
}

impl InterpreterConfig {
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    pub fn with_pause_scope(mut self, scope: PauseScope) -> Self {
        self.pause_scope = scope;
        self
    }
}

/// Hue bridge connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Host or `http(s)://host[:port]`
    pub address: String,

    /// Whitelisted API username
    pub username: String,

    #[serde(default = "default_request_timeout", with = "seconds")]
    pub request_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(address: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Base URL of the bridge's v1 API for this user
    pub fn api_url(&self) -> String {
        let address = self.address.trim_end_matches('/');
        if address.starts_with("http://") || address.starts_with("https://") {
            format!("{}/api/{}", address, self.username)
        } else {
            format!("http://{}/api/{}", address, self.username)
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HuebotConfig {
    #[serde(default)]
    pub interpreter: InterpreterConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge: Option<BridgeConfig>,
}

impl HuebotConfig {
    /// Check values serde accepts but huebot cannot use
    pub fn validate(&self) -> ConfigResult<()> {
        if self.interpreter.ack_timeout.is_zero() {
            return Err(invalid("interpreter.ack_timeout", "must be greater than zero"));
        }
        if let Some(bridge) = &self.bridge {
            if bridge.address.trim().is_empty() {
                return Err(invalid("bridge.address", "must not be empty"));
            }
            if bridge.username.trim().is_empty() {
                return Err(invalid("bridge.username", "must not be empty"));
            }
            if bridge.request_timeout.is_zero() {
                return Err(invalid("bridge.request_timeout", "must be greater than zero"));
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn default_ack_timeout() -> Duration {
    DEFAULT_ACK_TIMEOUT
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

/// Durations written as (fractional) seconds
mod seconds {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| de::Error::custom(format!("expected a non-negative number of seconds, got {}", secs)))
    }
}
