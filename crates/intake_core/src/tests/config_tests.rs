use std::collections::HashMap;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_use_longer_upload_timeout() {
    let settings = ClientSettings::default();
    assert_eq!(settings.request_timeout(), Duration::from_secs(30));
    assert_eq!(settings.upload_timeout(), Duration::from_secs(120));
    assert_eq!(settings.progress_phases().len(), 4);
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
    assert_eq!(normalize_database_url("sqlite:intake.db"), "sqlite://intake.db");
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_database_url("  "), "sqlite://./data/intake.db");
}

#[test]
fn app_prefixed_env_wins_over_legacy_name() {
    let settings = apply_env_overrides(
        ClientSettings::default(),
        env(&[
            ("INTAKE_API_URL", "http://legacy:1"),
            ("APP__API_BASE_URL", "http://api:8000"),
            ("APP__UPLOAD_TIMEOUT_SECS", "300"),
            ("APP__REQUEST_TIMEOUT_SECS", "not-a-number"),
            ("APP__DATABASE_URL", "/tmp/intake.db"),
        ]),
    );
    assert_eq!(settings.api_base_url, "http://api:8000");
    assert_eq!(settings.upload_timeout_secs, 300);
    assert_eq!(settings.request_timeout_secs, 30);
    assert_eq!(settings.database_url, "sqlite:///tmp/intake.db");
}

#[test]
fn reads_partial_toml_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("intake.toml");
    fs::write(
        &path,
        r#"
api_base_url = "https://tax.example.test"
upload_timeout_secs = 90

[[progress_phases]]
label = "Crunching"
min_duration_ms = 250
"#,
    )
    .expect("write config");

    let settings = load_settings_from(&path).expect("load");
    if std::env::var("APP__API_BASE_URL").is_err() && std::env::var("INTAKE_API_URL").is_err() {
        assert_eq!(settings.api_base_url, "https://tax.example.test");
    }
    assert_eq!(settings.progress_phases().len(), 1);
    assert_eq!(
        settings.progress_phases()[0].min_duration,
        Duration::from_millis(250)
    );
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("absent.toml")).expect("load");
    assert_eq!(settings.progress_phases.len(), 4);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("intake.toml");
    fs::write(&path, "upload_timeout_secs = \"soon\"").expect("write");
    assert!(load_settings_from(&path).is_err());
}
