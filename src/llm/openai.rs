//! OpenAI-compatible HTTP client for chat, image and transcription calls.

use std::future::Future;
use std::pin::Pin;

use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{CompletionRequest, LanguageModel};
use crate::config::OpenAiConfig;
use crate::{AppError, Result};

/// Result of an image generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    /// URL of the first generated image.
    pub url: String,
    /// Full response body, kept for step output.
    pub response: serde_json::Value,
}

/// Audio upload for the transcription endpoint.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Raw audio bytes.
    pub audio: Vec<u8>,
    /// File name reported in the multipart upload.
    pub file_name: String,
    /// MIME type of `audio`.
    pub mime: String,
    /// Transcription model identifier.
    pub model: String,
    /// ISO-639-1 language hint.
    pub language: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for an OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Create a client for `base_url` authenticating with `api_key`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
        }
    }

    /// Create a client from loaded configuration.
    #[must_use]
    pub fn from_config(config: &OpenAiConfig) -> Self {
        Self::new(config.base_url.clone(), config.api_key.clone())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Request a chat completion and return the first choice's text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` on transport failure and `AppError::Llm`
    /// on a non-success status, an error body, or an empty reply.
    pub async fn chat(&self, request: &CompletionRequest) -> Result<String> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "requesting chat completion"
        );
        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let body: ChatResponse = parse_json(response).await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Llm("empty choices array in completion".into()))?;

        match choice.finish_reason.as_deref() {
            Some("content_filter") => {
                return Err(AppError::Llm("completion was filtered by content policy".into()));
            }
            Some("length") => warn!("completion truncated by length limit"),
            _ => {}
        }

        choice
            .message
            .content
            .ok_or_else(|| AppError::Llm("completion has no content".into()))
    }

    /// Generate one image for `prompt` at `size`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Llm` if the API fails or returns no image URL.
    pub async fn generate_image(&self, prompt: &str, size: &str) -> Result<GeneratedImage> {
        let response = self
            .http
            .post(self.endpoint("images/generations"))
            .bearer_auth(&self.api_key)
            .json(&json!({ "prompt": prompt, "size": size, "n": 1 }))
            .send()
            .await?;

        let body: serde_json::Value = parse_json(response).await?;
        let url = body
            .pointer("/data/0/url")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| AppError::Llm("image response has no url".into()))?
            .to_owned();

        Ok(GeneratedImage {
            url,
            response: body,
        })
    }

    /// Fetch the raw bytes at `url` without authentication.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` on transport failure or non-success status.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    /// Transcribe an audio upload and return the text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Http` on transport failure and `AppError::Llm`
    /// if the API rejects the upload.
    pub async fn transcribe(&self, request: TranscriptionRequest) -> Result<String> {
        let file = Part::bytes(request.audio)
            .file_name(request.file_name)
            .mime_str(&request.mime)?;
        let form = Form::new()
            .text("model", request.model)
            .text("language", request.language)
            .part("file", file);

        let response = self
            .http
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let body: TranscriptionResponse = parse_json(response).await?;
        Ok(body.text)
    }
}

impl LanguageModel for OpenAiClient {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.chat(request))
    }

    fn provider(&self) -> &str {
        "openai"
    }
}

/// Decode a JSON body, turning error statuses into `AppError::Llm`.
async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map_or(text, |envelope| envelope.error.message);
        return Err(AppError::Llm(format!("api error ({status}): {message}")));
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&text) {
        return Err(AppError::Llm(format!("api error: {}", envelope.error.message)));
    }

    serde_json::from_str(&text)
        .map_err(|err| AppError::Llm(format!("failed to parse api response: {err}")))
}
