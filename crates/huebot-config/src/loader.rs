//! YAML configuration loader with `!env_var` support
//!
//! `!env_var NAME` substitutes the variable's value; `!env_var NAME default`
//! falls back to `default` when the variable is unset. Substituted text is
//! read as a YAML scalar, so `!env_var HUEBOT_ACK_TIMEOUT 10` yields a number.

use crate::error::{ConfigError, ConfigResult};
use crate::settings::HuebotConfig;
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// Load, tag-process and validate a configuration file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<HuebotConfig> {
    let path = path.as_ref();
    debug!("Loading configuration file: {:?}", path);

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_str(&content, path)
}

/// Load, tag-process and validate configuration from a string
///
/// `source` only labels errors.
pub fn load_config_str(content: &str, source: &Path) -> ConfigResult<HuebotConfig> {
    let value = load_yaml_string(content, source)?;

    // An empty document means "all defaults"
    let config: HuebotConfig = if value.is_null() {
        HuebotConfig::default()
    } else {
        serde_yaml::from_value(value).map_err(|e| ConfigError::ParseYaml {
            path: source.to_path_buf(),
            source: e,
        })?
    };

    config.validate()?;
    Ok(config)
}

/// Parse YAML and resolve custom tags, without schema checks
pub fn load_yaml_string(content: &str, source: &Path) -> ConfigResult<Value> {
    let value: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
        path: source.to_path_buf(),
        source: e,
    })?;

    process_value(value)
}

fn process_value(value: Value) -> ConfigResult<Value> {
    match value {
        Value::Tagged(tagged) => process_tagged(*tagged),
        Value::Mapping(map) => {
            let mut result = serde_yaml::Mapping::new();
            for (k, v) in map {
                result.insert(process_value(k)?, process_value(v)?);
            }
            Ok(Value::Mapping(result))
        }
        Value::Sequence(seq) => {
            let result: ConfigResult<Vec<Value>> = seq.into_iter().map(process_value).collect();
            Ok(Value::Sequence(result?))
        }
        _ => Ok(value),
    }
}

fn process_tagged(tagged: serde_yaml::value::TaggedValue) -> ConfigResult<Value> {
    let tag = tagged.tag.to_string();
    trace!("Processing tag '{}' with value {:?}", tag, tagged.value);

    match tag.as_str() {
        "!env_var" => process_env_var(tagged.value),
        _ => Err(ConfigError::InvalidTag { tag }),
    }
}

/// Process !env_var tag
fn process_env_var(value: Value) -> ConfigResult<Value> {
    let spec = match value {
        Value::String(s) => s,
        _ => {
            return Err(ConfigError::InvalidValue {
                key: "!env_var".to_string(),
                reason: "environment variable name must be a string".to_string(),
            })
        }
    };

    let (var_name, default) = match spec.trim().split_once(char::is_whitespace) {
        Some((name, default)) => (name.to_string(), Some(default.trim().to_string())),
        None => (spec.trim().to_string(), None),
    };

    let text = match std::env::var(&var_name) {
        Ok(value) => {
            debug!("Substituted env var: {}", var_name);
            value
        }
        Err(_) => default.ok_or(ConfigError::EnvVarNotFound { var: var_name })?,
    };

    Ok(scalar(text))
}

/// Read text as a YAML scalar, keeping it a string when it is anything else
fn scalar(text: String) -> Value {
    match serde_yaml::from_str::<Value>(&text) {
        Ok(v @ (Value::Bool(_) | Value::Number(_))) => v,
        _ => Value::String(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source() -> PathBuf {
        PathBuf::from("huebot.yaml")
    }

    fn get<'a>(value: &'a Value, key: &str) -> &'a Value {
        value.as_mapping().unwrap().get(key).unwrap()
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("HUEBOT_LOADER_TEST_USER", "abc123");
        let value = load_yaml_string("user: !env_var HUEBOT_LOADER_TEST_USER\n", &source()).unwrap();
        assert_eq!(get(&value, "user"), &Value::String("abc123".to_string()));
    }

    #[test]
    fn test_env_var_number_is_typed() {
        std::env::set_var("HUEBOT_LOADER_TEST_TIMEOUT", "2.5");
        let value =
            load_yaml_string("timeout: !env_var HUEBOT_LOADER_TEST_TIMEOUT\n", &source()).unwrap();
        assert_eq!(get(&value, "timeout").as_f64(), Some(2.5));
    }

    #[test]
    fn test_env_var_default() {
        std::env::remove_var("HUEBOT_LOADER_TEST_UNSET");
        let value = load_yaml_string(
            "address: !env_var HUEBOT_LOADER_TEST_UNSET 192.168.1.2\n",
            &source(),
        )
        .unwrap();
        assert_eq!(
            get(&value, "address"),
            &Value::String("192.168.1.2".to_string())
        );
    }

    #[test]
    fn test_env_var_missing() {
        std::env::remove_var("HUEBOT_LOADER_TEST_MISSING");
        let err = load_yaml_string("user: !env_var HUEBOT_LOADER_TEST_MISSING\n", &source())
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound { var } if var == "HUEBOT_LOADER_TEST_MISSING"));
    }

    #[test]
    fn test_unknown_tag() {
        let err = load_yaml_string("user: !secret hue_user\n", &source()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTag { tag } if tag == "!secret"));
    }
}
