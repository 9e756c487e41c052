//! Binary startup tests

use std::process::Command;
use tempfile::TempDir;

/// The server exits non-zero before binding when the bundle is missing
#[test]
fn test_missing_bundle_aborts_startup() {
    let dir = TempDir::new().unwrap();
    let model_dir = dir.path().join("model");

    let output = Command::new(env!("CARGO_BIN_EXE_prediction-server"))
        .env("PREDICTOR_MODEL_DIR", &model_dir)
        .env("PREDICTOR_BIND_ADDRESS", "127.0.0.1")
        .env("PREDICTOR_API_PORT", "0")
        .env("PREDICTOR_METRICS_PORT", "0")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(1), "stderr: {stderr}");
    assert!(
        stderr.contains("Cannot start without a valid artifact bundle"),
        "stderr: {stderr}"
    );
    assert!(stderr.contains("scaler.json"), "stderr: {stderr}");
    assert!(
        stdout.contains("Failed to load artifact bundle"),
        "stdout: {stdout}"
    );
}

/// A bundle with a corrupt scaler is rejected at startup
#[test]
fn test_corrupt_scaler_aborts_startup() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("scaler.json"), b"{\"mean\": 1}").unwrap();
    std::fs::write(dir.path().join("model.json"), b"{}").unwrap();
    std::fs::write(dir.path().join("feature_names.json"), b"{}").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_prediction-server"))
        .env("PREDICTOR_MODEL_DIR", dir.path())
        .env("PREDICTOR_BIND_ADDRESS", "127.0.0.1")
        .env("PREDICTOR_API_PORT", "0")
        .env("PREDICTOR_METRICS_PORT", "0")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1), "stderr: {stderr}");
    assert!(
        stderr.contains("Cannot start without a valid artifact bundle"),
        "stderr: {stderr}"
    );
}
