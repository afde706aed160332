//! Integration tests for the `restora config` commands.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn restora(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("restora-cli").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env_remove("RESTORA_MODEL")
        .env_remove("RESTORA_BASE_URL")
        .env_remove("RESTORA_OUTPUT_DIR");
    cmd
}

#[test]
fn test_config_show_json_masks_key() {
    let home = TempDir::new().unwrap();

    let assert = restora(&home)
        .env("GEMINI_API_KEY", "abcdef123456")
        .args(["config", "show", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(!stdout.contains("abcdef123456"));
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["api_key"], "********3456");
    assert_eq!(value["model"], "gemini-2.5-flash-image-preview");
}

#[test]
fn test_config_show_without_key() {
    let home = TempDir::new().unwrap();

    restora(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not configured"));
}

#[test]
fn test_config_global_file_is_read() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".restora");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "model = \"from-file\"\ntimeout_secs = 30\n").unwrap();

    let assert = restora(&home).args(["config", "show", "--json"]).assert().success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["model"], "from-file");
    assert_eq!(value["timeout_secs"], 30);
}

#[test]
fn test_config_cli_model_overrides_file() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".restorarc"), "model = \"from-file\"\n").unwrap();

    restora(&home)
        .args(["--model", "from-flag", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Model: from-flag"));
}

#[test]
fn test_config_invalid_file_fails() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("bad.toml");
    std::fs::write(&path, "log_level = \"loud\"\n").unwrap();

    restora(&home)
        .arg("--config")
        .arg(&path)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("log_level"));
}

#[test]
fn test_config_path_prints_locations() {
    let home = TempDir::new().unwrap();

    restora(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".restora"))
        .stdout(predicate::str::contains(".restorarc"));
}

#[test]
fn test_broken_local_config_is_reported() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".restorarc"), "api_key = [\n").unwrap();

    restora(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring configuration file"))
        .stdout(predicate::str::contains("Not configured"));
}

#[test]
fn test_broken_global_config_is_reported_at_debug_level() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".restora");
    std::fs::create_dir(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "model = \n").unwrap();

    restora(&home)
        .args(["--log-level", "debug", "config", "show"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Ignoring configuration file"));
}
