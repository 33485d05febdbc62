//! Exercises `AppConfig::load_from_file` against real files on disk, rather
//! than the in-memory JSON strings the unit tests in `config.rs` use.

use std::io::Write;

use serialbridge::config::{AppConfig, BridgeMode};

#[test]
fn missing_file_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.json");

    let config = AppConfig::load_from_file(path.to_str().unwrap()).unwrap();
    assert_eq!(config.bridges.len(), 1);
    assert!(!config.bridges[0].open);
}

#[test]
fn loads_a_written_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "server": {{ "log_level": "debug" }},
            "bridges": [
                {{
                    "name": "panel-a",
                    "url": "rfc2217://192.0.2.10:2217",
                    "listener": "0.0.0.0:3000",
                    "baudrate": 19200,
                    "mode": "rfc2217",
                    "open": true
                }},
                {{
                    "name": "panel-b",
                    "url": "/dev/ttyUSB1",
                    "listener": "0.0.0.0:3001",
                    "mode": "raw",
                    "timeout": -1,
                    "open": false
                }}
            ]
        }}"#
    )
    .unwrap();
    file.flush().unwrap();

    let config = AppConfig::load_from_file(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.server.log_level, "debug");
    assert_eq!(config.bridges.len(), 2);

    let a = &config.bridges[0];
    assert_eq!(a.name, "panel-a");
    assert_eq!(a.baudrate, 19200);
    assert_eq!(a.mode, BridgeMode::Rfc2217);
    assert!(a.open);

    let b = &config.bridges[1];
    assert_eq!(b.mode, BridgeMode::Raw);
    assert!(b.timeout.is_none());
    assert!(!b.open);
}

#[test]
fn malformed_json_is_reported_not_panicked() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    file.flush().unwrap();

    let result = AppConfig::load_from_file(file.path().to_str().unwrap());
    assert!(result.is_err());
}
