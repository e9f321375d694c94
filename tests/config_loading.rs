use std::io::Write;
use std::path::Path;

use waypoint_core::config::AppConfig;
use waypoint_core::error::WaypointError;

#[test]
fn test_load_full_config_from_file() {
    let toml_content = r#"
[gateway]
bind = "0.0.0.0:9999"

[[engine.preload]]
graph_id = "review-main"

[[engine.preload]]
graph_id = "review-alt"
workflow = "code_review"

[tools]
timeout_secs = 5

[log]
filter = "waypoint=debug"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.gateway.bind, "0.0.0.0:9999");
    assert_eq!(config.engine.preload.len(), 2);
    assert_eq!(config.engine.preload[0].graph_id, "review-main");
    assert_eq!(config.engine.preload[0].workflow, "code_review");
    assert_eq!(config.engine.preload[1].graph_id, "review-alt");
    assert_eq!(config.tools.timeout_secs, 5);
    assert_eq!(config.log.filter, "waypoint=debug");
}

#[test]
fn test_env_var_expansion_in_config() {
    std::env::set_var("WAYPOINT_TEST_BIND", "127.0.0.1:7070");

    let toml_content = r#"
[gateway]
bind = "${WAYPOINT_TEST_BIND}"
"#;

    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(toml_content.as_bytes()).expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert_eq!(config.gateway.bind, "127.0.0.1:7070");

    std::env::remove_var("WAYPOINT_TEST_BIND");
}

#[test]
fn test_empty_config_uses_defaults() {
    let tmp = tempfile::NamedTempFile::new().expect("create temp file");

    let config = AppConfig::load(tmp.path()).expect("load config");

    assert_eq!(config.gateway.bind, "127.0.0.1:8000");
    assert_eq!(config.engine.preload.len(), 1);
    assert_eq!(config.engine.preload[0].graph_id, "code_review");
    assert_eq!(config.tools.timeout_secs, 30);
    assert_eq!(config.log.filter, "waypoint=info,warn");
}

#[test]
fn test_empty_preload_list_disables_preload() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[engine]\npreload = []\n").expect("write toml");

    let config = AppConfig::load(tmp.path()).expect("load config");
    assert!(config.engine.preload.is_empty());
}

#[test]
fn test_missing_file_is_config_not_found() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("absent.toml");

    let err = AppConfig::load(&path).unwrap_err();
    assert!(matches!(err, WaypointError::ConfigNotFound(_)));

    let config = AppConfig::load_or_default(&path).expect("fallback to defaults");
    assert_eq!(config.gateway.bind, "127.0.0.1:8000");
}

#[test]
fn test_malformed_config_is_rejected() {
    let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
    tmp.write_all(b"[tools]\ntimeout_secs = \"soon\"\n").expect("write toml");

    let err = AppConfig::load(Path::new(tmp.path())).unwrap_err();
    assert!(matches!(err, WaypointError::Config(_)));
}
