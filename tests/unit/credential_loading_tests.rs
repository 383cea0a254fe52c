//! Unit tests for backend API key loading.
//!
//! These mutate process environment variables and therefore run serially.

use chat_herald::config::GlobalConfig;
use serial_test::serial;

const API_KEY_ENV: &str = "CHAT_HERALD_API_KEY";

fn backend_enabled() -> GlobalConfig {
    GlobalConfig::from_toml_str("[backend]\nenabled = true\n").expect("valid config")
}

#[tokio::test]
#[serial]
async fn disabled_backend_skips_credential_lookup() {
    std::env::remove_var(API_KEY_ENV);
    let mut config = GlobalConfig::default();
    config.load_credentials().await.expect("no-op");
    assert!(config.backend.api_key.is_empty());
    assert!(!config.backend.enabled);
}

#[tokio::test]
#[serial]
async fn env_var_supplies_api_key() {
    std::env::set_var(API_KEY_ENV, "sk-test-123");
    let mut config = backend_enabled();
    let result = config.load_credentials().await;
    std::env::remove_var(API_KEY_ENV);

    result.expect("credentials load");
    assert!(config.backend.enabled);
    assert!(!config.backend.api_key.is_empty());
}

#[tokio::test]
#[serial]
async fn missing_api_key_disables_backend() {
    std::env::remove_var(API_KEY_ENV);
    let mut config = backend_enabled();
    config.load_credentials().await.expect("missing key is not an error");

    // Only meaningful when no keychain entry exists on this machine.
    if config.backend.api_key.is_empty() {
        assert!(!config.backend.enabled);
    }
}
