//! Integration tests for device configuration loading

use rfid_agent::infra::{ConfigError, DeviceConfig, Identity};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_config_from_file() {
    let file = write_config(
        r#"{
  "deviceSerial": "SW-2024-0042",
  "apiKey": "k-3f9a7c",
  "backendUrl": "https://wardrobe.example.com/api/"
}"#,
    );

    let config = DeviceConfig::from_file(file.path()).unwrap();
    assert_eq!(config.device_serial, "SW-2024-0042");
    assert_eq!(config.api_key, "k-3f9a7c");
    assert_eq!(config.base_url(), "https://wardrobe.example.com/api");
}

#[test]
fn test_missing_api_key_is_rejected() {
    // Required field absent: load fails before any network activity
    let file = write_config(
        r#"{"deviceSerial": "SW-2024-0042", "backendUrl": "https://wardrobe.example.com"}"#,
    );
    assert!(DeviceConfig::from_file(file.path()).is_err());
    assert!(Identity::load(file.path()).is_err());
}

#[test]
fn test_absent_config_file_is_rejected() {
    let result = DeviceConfig::from_file(Path::new("/nonexistent/rfid/config.json"));
    assert!(matches!(result, Err(ConfigError::Missing(_))));
}

#[test]
fn test_unparsable_config_is_rejected() {
    let file = write_config("deviceSerial = not json");
    assert!(matches!(
        DeviceConfig::from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_identity_reload_swaps_config() {
    let file = write_config(
        r#"{"deviceSerial": "SW-1", "apiKey": "old", "backendUrl": "https://a.example.com"}"#,
    );
    let identity = Identity::load(file.path()).unwrap();

    std::fs::write(
        file.path(),
        r#"{"deviceSerial": "SW-1", "apiKey": "new", "backendUrl": "https://b.example.com"}"#,
    )
    .unwrap();
    identity.reload();

    let current = identity.current();
    assert_eq!(current.api_key, "new");
    assert_eq!(current.base_url(), "https://b.example.com");
}
