//! Configuration file tests

use huebot_config::{load_config, load_config_str, ConfigError, PauseScope};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn test_load_full_config() {
    std::env::set_var("HUEBOT_CONFIG_TEST_USER", "newdeveloper");

    let dir = TempDir::new().unwrap();
    let path = write_file(
        dir.path(),
        "huebot.yaml",
        r#"
interpreter:
  ack_timeout: 2.5
  pause_scope: around_loop
bridge:
  address: 10.0.0.4
  username: !env_var HUEBOT_CONFIG_TEST_USER
"#,
    );

    let config = load_config(&path).unwrap();
    assert_eq!(config.interpreter.ack_timeout, Duration::from_millis(2500));
    assert_eq!(config.interpreter.pause_scope, PauseScope::AroundLoop);

    let bridge = config.bridge.unwrap();
    assert_eq!(bridge.username, "newdeveloper");
    assert_eq!(bridge.request_timeout, Duration::from_secs(5));
    assert_eq!(bridge.api_url(), "http://10.0.0.4/api/newdeveloper");
}

#[test]
fn test_empty_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "huebot.yaml", "");

    let config = load_config(&path).unwrap();
    assert_eq!(config.interpreter.ack_timeout, Duration::from_secs(10));
    assert_eq!(config.interpreter.pause_scope, PauseScope::PerIteration);
    assert!(config.bridge.is_none());
}

#[test]
fn test_env_var_default_feeds_typed_field() {
    std::env::remove_var("HUEBOT_CONFIG_TEST_TIMEOUT");
    let config = load_config_str(
        "interpreter:\n  ack_timeout: !env_var HUEBOT_CONFIG_TEST_TIMEOUT 4\n",
        Path::new("inline.yaml"),
    )
    .unwrap();
    assert_eq!(config.interpreter.ack_timeout, Duration::from_secs(4));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = load_config(dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn test_unknown_key_is_rejected() {
    let err = load_config_str("interpreter:\n  fade: true\n", Path::new("inline.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::ParseYaml { .. }));
}

#[test]
fn test_negative_timeout_is_rejected() {
    let err = load_config_str("interpreter:\n  ack_timeout: -1\n", Path::new("inline.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::ParseYaml { .. }));
}

#[test]
fn test_empty_username_is_invalid() {
    let err = load_config_str(
        "bridge:\n  address: 10.0.0.4\n  username: \"\"\n",
        Path::new("inline.yaml"),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "bridge.username"));
}
