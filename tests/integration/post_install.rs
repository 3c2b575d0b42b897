use std::{fs, process::Command};

use anyhow::Result;
use serde_json::Value;
use tempfile::tempdir;

use crate::common::BINARY_PATH;

#[test]
fn post_install_provisions_and_exits_zero() -> Result<()> {
    let temp = tempdir()?;
    let config_path = temp.path().join("config.toml");

    let output = Command::new(BINARY_PATH)
        .arg("--post-install")
        .arg("--config")
        .arg(&config_path)
        .env("RUST_LOG", "warn")
        .output()?;

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let report: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(report["status"], "ok");
    assert_eq!(report["config_file"], "written");
    assert!(config_path.is_file());
    assert!(temp.path().join("models/model_descriptions.json").is_file());
    Ok(())
}

#[test]
fn failed_post_install_exits_one_without_serving() -> Result<()> {
    let temp = tempdir()?;
    fs::write(temp.path().join("blocker"), b"not a directory")?;
    let config_path = temp.path().join("config.toml");
    fs::write(&config_path, "[models]\ndir = \"blocker/models\"\n")?;

    let output = Command::new(BINARY_PATH)
        .arg("--post-install")
        .arg("--config")
        .arg(&config_path)
        .env("RUST_LOG", "warn")
        .output()?;

    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert!(output.stdout.is_empty(), "no report and no MCP traffic on stdout");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("models directory"), "{stderr}");
    Ok(())
}
