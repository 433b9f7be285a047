//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::{resolver, AppError, Result};

/// Keychain service under which credentials are stored.
const KEYRING_SERVICE: &str = "ai-cookbook";

/// Image sizes accepted by the image generation endpoint.
const ALLOWED_IMAGE_SIZES: [&str; 3] = ["256x256", "512x512", "1024x1024"];

/// OpenAI-compatible API connectivity.
///
/// The API key is loaded at runtime via OS keychain or environment
/// variable, not from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct OpenAiConfig {
    /// Base URL of the API, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Chat model used by the resolver.
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Bearer token (populated at runtime).
    #[serde(skip)]
    pub api_key: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            api_key: String::new(),
        }
    }
}

/// Natural-language-to-SQL resolver settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ResolverConfig {
    /// Sampling temperature for SQL completions.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Tables whose definitions ground the translation prompt.
    #[serde(default = "default_schema_tables")]
    pub schema_tables: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            schema_tables: default_schema_tables(),
        }
    }
}

/// Image generation settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ImageConfig {
    /// Requested image size, e.g. `256x256`.
    #[serde(default = "default_image_size")]
    pub size: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            size: default_image_size(),
        }
    }
}

/// Speech transcription settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TranscriptionConfig {
    /// Transcription model identifier.
    #[serde(default = "default_transcription_model")]
    pub model: String,
    /// ISO-639-1 language hint.
    #[serde(default = "default_language")]
    pub language: String,
    /// MIME type reported for uploaded audio.
    #[serde(default = "default_audio_mime")]
    pub mime: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: default_transcription_model(),
            language: default_language(),
            mime: default_audio_mime(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_chat_model() -> String {
    resolver::DEFAULT_CHAT_MODEL.into()
}

fn default_temperature() -> f32 {
    resolver::DEFAULT_TEMPERATURE
}

fn default_schema_tables() -> Vec<String> {
    ["User", "Order", "OrderEntry", "Product"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_image_size() -> String {
    "256x256".into()
}

fn default_transcription_model() -> String {
    "whisper-1".into()
}

fn default_language() -> String {
    "en".into()
}

fn default_audio_mime() -> String {
    "audio/webm".into()
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Root directory holding the database, step logs and images.
    pub workspace_root: PathBuf,
    /// API connectivity settings.
    #[serde(default)]
    pub openai: OpenAiConfig,
    /// Resolver settings.
    #[serde(default)]
    pub resolver: ResolverConfig,
    /// Image recipe settings.
    #[serde(default)]
    pub image: ImageConfig,
    /// Transcription recipe settings.
    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the API key from OS keychain with env-var fallback.
    ///
    /// Tries the `ai-cookbook` keyring service first, then falls back to
    /// the `OPENAI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither source provides a key.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.openai.api_key = load_credential("openai_api_key", "OPENAI_API_KEY").await?;
        Ok(())
    }

    /// Path of the embedded `SQLite` database file.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.workspace_root.join(".cookbook").join("financial.db")
    }

    /// Directory receiving daily step logs.
    #[must_use]
    pub fn trace_dir(&self) -> PathBuf {
        self.workspace_root.join(".cookbook").join("steps")
    }

    /// Directory receiving downloaded images.
    #[must_use]
    pub fn images_dir(&self) -> PathBuf {
        self.workspace_root.join("images")
    }

    fn validate(&mut self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.resolver.temperature) {
            return Err(AppError::Config(
                "resolver.temperature must be between 0 and 2".into(),
            ));
        }

        if self.resolver.schema_tables.is_empty() {
            return Err(AppError::Config(
                "resolver.schema_tables must not be empty".into(),
            ));
        }

        if !ALLOWED_IMAGE_SIZES.contains(&self.image.size.as_str()) {
            return Err(AppError::Config(format!(
                "image.size must be one of {}",
                ALLOWED_IMAGE_SIZES.join(", ")
            )));
        }

        self.openai.base_url = self.openai.base_url.trim_end_matches('/').to_owned();
        if self.openai.base_url.is_empty() {
            return Err(AppError::Config("openai.base_url must not be empty".into()));
        }

        let canonical_root = self
            .workspace_root
            .canonicalize()
            .map_err(|err| AppError::Config(format!("workspace_root invalid: {err}")))?;
        self.workspace_root = canonical_root;

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}
