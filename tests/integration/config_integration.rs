//! Configuration loading across file and environment sources.

use std::sync::Mutex;

use clipforge::config::ClipforgeConfig;
use tempfile::TempDir;

// `ClipforgeConfig::load` reads CLIPFORGE_* environment variables, so every
// test that calls it must hold this mutex, not just the ones that set vars.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn file_settings_layer_over_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("config.toml");

    std::fs::write(
        &config_file,
        r#"
[provider]
api_key = "k-video"
model = "clip-video-2"

[fallback]
api_key = "k-text"

[cache]
max_size = 32

[polling]
max_attempts = 20

[logging]
level = "debug"
format = "json"
"#,
    )
    .unwrap();

    let config = ClipforgeConfig::load(Some(&config_file)).unwrap();
    assert_eq!(config.provider.model, "clip-video-2");
    assert_eq!(config.provider.api_key.as_deref(), Some("k-video"));
    assert_eq!(config.fallback.api_key.as_deref(), Some("k-text"));
    assert_eq!(config.cache.max_size, 32);
    assert_eq!(config.polling.max_attempts, 20);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    // Defaults fill everything the file omits.
    assert_eq!(config.provider.base_url, "https://api.example-video.dev/v1");
    assert_eq!(config.polling.poll_interval_ms, 5_000);
    assert!(config.validate().is_ok());
}

#[test]
fn environment_overrides_the_file() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_file,
        r#"
[provider]
model = "clip-video-2"
"#,
    )
    .unwrap();

    std::env::set_var("CLIPFORGE_PROVIDER__MODEL", "clip-video-env");
    std::env::set_var("CLIPFORGE_CACHE__MAX_SIZE", "7");

    let result = ClipforgeConfig::load(Some(&config_file));

    std::env::remove_var("CLIPFORGE_PROVIDER__MODEL");
    std::env::remove_var("CLIPFORGE_CACHE__MAX_SIZE");

    let config = result.unwrap();
    assert_eq!(config.provider.model, "clip-video-env");
    assert_eq!(config.cache.max_size, 7);
}

#[test]
fn invalid_settings_are_rejected_with_every_error() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("config.toml");
    std::fs::write(
        &config_file,
        r#"
[provider]
model = ""

[polling]
poll_interval_ms = 0
"#,
    )
    .unwrap();

    let config = ClipforgeConfig::load(Some(&config_file)).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
    let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert!(rendered.iter().any(|e| e.starts_with("Provider:")));
    assert!(rendered.iter().any(|e| e.starts_with("Polling:")));
}
