//! Tests for loading recorder configuration from disk.
#![cfg(feature = "server")]

use std::io::Write;

use huginn::server::config::Config;
use huginn::{BackendMode, HuginnError, RequestMetadata, RunnerKey};

#[test]
fn load_explicit_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [server]
        address = "0.0.0.0:9000"

        [recorder]
        history_capacity = 2
        backend = "mlx"
        "#
    )
    .unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.server.socket_addr().unwrap().port(), 9000);

    let recorder = config
        .recorder
        .builder()
        .normalize(|m| m.to_lowercase())
        .build()
        .unwrap();
    let runner = RunnerKey::new("mlx", "Qwen", BackendMode::Completion);
    for _ in 0..3 {
        recorder.record_request(&runner, &RequestMetadata::new("POST", "/"), b"{}");
    }

    assert_eq!(recorder.query("qwen").unwrap().records.len(), 2);
}

#[test]
fn unparseable_file_is_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[recorder]\nhistory_capacity = \"lots\"").unwrap();

    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(matches!(err, HuginnError::Configuration(_)));
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn zero_capacity_from_file_fails_to_build() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[recorder]\nhistory_capacity = 0").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    assert!(config.recorder.builder().build().is_err());
}
