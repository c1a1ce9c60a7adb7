//! YAML configuration for huebot
//!
//! Settings for the interpreter (acknowledgement timeout, pause scope) and the
//! Hue bridge connection, loaded from YAML with `!env_var` substitution:
//!
//! - `!env_var VAR` - Environment variable substitution
//! - `!env_var VAR default` - Same, with a fallback when `VAR` is unset
//!
//! # Example
//!
//! ```ignore
//! use huebot_config::load_config;
//!
//! let config = load_config("/etc/huebot/huebot.yaml")?;
//! let timeout = config.interpreter.ack_timeout;
//! ```

mod error;
mod loader;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, load_yaml_string};
pub use settings::{
    BridgeConfig, HuebotConfig, InterpreterConfig, PauseScope, DEFAULT_ACK_TIMEOUT,
    DEFAULT_REQUEST_TIMEOUT,
};

// Re-export serde_yaml::Value for convenience
pub use serde_yaml::Value;
