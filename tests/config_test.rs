mod common;

use common::DeskTest;
use serde_json::Value;

#[test]
fn test_config_show_defaults() {
    let desk = DeskTest::new();
    let stdout = desk.run_success(&["config", "show", "--json"]);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["service"]["url"], Value::Null);
    assert_eq!(json["service"]["api_key_configured"], false);
    assert_eq!(json["remote_timeout"], 30);
}

#[test]
fn test_config_set_and_get_url() {
    let desk = DeskTest::new();
    desk.run_success(&["config", "set", "service.url", "https://desk.example.com/"]);

    let stdout = desk.run_success(&["config", "get", "service.url"]);
    assert_eq!(stdout.trim(), "https://desk.example.com");
    assert!(desk.temp_dir.path().join(".ticketdesk/config.yaml").exists());
}

#[test]
fn test_config_rejects_bad_url() {
    let desk = DeskTest::new();
    let stderr = desk.run_failure(&["config", "set", "service.url", "ftp://desk.example.com"]);
    assert!(stderr.contains("http or https"));

    let stderr = desk.run_failure(&["config", "set", "service.url", "not a url"]);
    assert!(stderr.contains("invalid service.url"));
}

#[test]
fn test_config_masks_api_key() {
    let desk = DeskTest::new();
    let key = "eyJhbGciOiJIUzI1NiJ9.secret";
    let stdout = desk.run_success(&["config", "set", "service.api_key", key]);
    assert!(!stdout.contains(key));

    let stdout = desk.run_success(&["config", "get", "service.api_key", "--json"]);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["value"], "ey...et");

    let stdout = desk.run_success(&["config", "show", "--json"]);
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["service"]["api_key_configured"], true);
    assert!(!stdout.contains(key));
}

#[test]
fn test_config_unknown_key() {
    let desk = DeskTest::new();
    let stderr = desk.run_failure(&["config", "get", "service.password"]);
    assert!(stderr.contains("unknown config key"));
}

#[test]
fn test_config_numeric_values() {
    let desk = DeskTest::new();
    desk.run_success(&["config", "set", "sync.coalesce_ms", "250"]);
    let stdout = desk.run_success(&["config", "get", "sync.coalesce_ms"]);
    assert_eq!(stdout.trim(), "250");

    let stderr = desk.run_failure(&["config", "set", "remote_timeout", "soon"]);
    assert!(stderr.contains("non-negative integer"));
}

#[test]
fn test_backend_commands_need_configuration() {
    let desk = DeskTest::new();
    let stderr = desk.run_failure(&["ls"]);
    assert!(stderr.contains("service.url is not set"));
}
