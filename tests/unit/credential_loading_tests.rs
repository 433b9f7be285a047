//! Unit tests for API key loading.
//!
//! These tests mutate process-global env vars and must run serially.

use ai_cookbook::{config::GlobalConfig, AppError};

fn make_config() -> (tempfile::TempDir, GlobalConfig) {
    let temp = tempfile::tempdir().expect("tempdir");
    let toml = format!(
        "workspace_root = '{}'\n",
        temp.path().to_str().expect("utf8 path")
    );
    let config = GlobalConfig::from_toml_str(&toml).expect("config parses");
    (temp, config)
}

#[tokio::test]
#[serial_test::serial]
async fn api_key_loaded_from_env_var() {
    let (_temp, mut config) = make_config();
    std::env::set_var("OPENAI_API_KEY", "sk-test-123");

    let result = config.load_credentials().await;
    std::env::remove_var("OPENAI_API_KEY");

    result.expect("credentials load from env");
    assert_eq!(config.openai.api_key, "sk-test-123");
}

#[tokio::test]
#[serial_test::serial]
async fn missing_api_key_names_env_var() {
    let (_temp, mut config) = make_config();
    std::env::remove_var("OPENAI_API_KEY");

    let result = config.load_credentials().await;

    match result {
        Err(AppError::Config(msg)) => {
            assert!(msg.contains("OPENAI_API_KEY"), "message: {msg}");
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[tokio::test]
#[serial_test::serial]
async fn empty_env_var_is_treated_as_missing() {
    let (_temp, mut config) = make_config();
    std::env::set_var("OPENAI_API_KEY", "");

    let result = config.load_credentials().await;
    std::env::remove_var("OPENAI_API_KEY");

    assert!(matches!(result, Err(AppError::Config(_))));
    assert!(config.openai.api_key.is_empty());
}
