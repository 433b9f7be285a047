//! Speech transcription recipe.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::config::TranscriptionConfig;
use crate::llm::openai::{OpenAiClient, TranscriptionRequest};
use crate::models::message::ConversationMessage;
use crate::trace::{record_or_warn, Attachment, Generation, Step, StepRecorder, StepType};
use crate::{AppError, Result};

/// Thread grouping transcription runs.
pub const THREAD_NAME: &str = "Speech to Emoji Thread";

/// Name of the run recorded per transcription.
pub const RUN_NAME: &str = "Speech to Emoji";

/// Transcribes audio files and records the call as a generation.
pub struct TranscriptionRecipe {
    client: OpenAiClient,
    config: TranscriptionConfig,
    recorder: Option<Arc<dyn StepRecorder>>,
}

impl TranscriptionRecipe {
    /// Create a recipe using `config` for model, language and MIME type.
    #[must_use]
    pub fn new(client: OpenAiClient, config: TranscriptionConfig) -> Self {
        Self {
            client,
            config,
            recorder: None,
        }
    }

    /// Record run and generation steps to `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn StepRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Transcribe the audio file at `path`.
    ///
    /// `run_id` lets the caller correlate the run with its own records;
    /// a fresh id is generated when omitted. The run is recorded once
    /// before the upload and again when it finishes or fails.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be read, or the API error.
    pub async fn transcribe(&self, path: &Path, run_id: Option<String>) -> Result<String> {
        let audio = tokio::fs::read(path)
            .await
            .map_err(|err| AppError::Io(format!("failed to read {}: {err}", path.display())))?;
        if audio.is_empty() {
            return Err(AppError::Io("no audio file provided".into()));
        }

        let thread_id = Uuid::new_v4().to_string();
        info!(thread = THREAD_NAME, %thread_id, "transcription thread opened");

        let attachment = Attachment::new("Audio file", &self.config.mime, path.display().to_string());
        let mut run = Step::new(RUN_NAME, StepType::Run)
            .with_thread(thread_id.clone())
            .with_input(json!({ "input": { "content": "Audio file" } }))
            .with_attachment(attachment.clone());
        if let Some(id) = run_id {
            run = run.with_id(id);
        }
        // Open run first; the finished record with the same id supersedes it.
        self.record(&run);

        let file_name = path
            .file_name()
            .map_or_else(|| "audio.webm".to_owned(), |n| n.to_string_lossy().into_owned());
        let started = Utc::now();
        let result = self
            .client
            .transcribe(TranscriptionRequest {
                audio,
                file_name,
                mime: self.config.mime.clone(),
                model: self.config.model.clone(),
                language: self.config.language.clone(),
            })
            .await;

        let text = match result {
            Ok(text) => text,
            Err(err) => {
                self.record(&run.with_error(err.to_string()).finish());
                return Err(err);
            }
        };

        let input = ConversationMessage::user("See attached audio file");
        let output = ConversationMessage::assistant(text.clone());
        let mut llm_step = Step::new(self.config.model.clone(), StepType::Llm)
            .with_parent(run.id.clone())
            .with_thread(thread_id)
            .with_input(json!(input))
            .with_output(json!(output))
            .with_attachment(attachment)
            .with_generation(
                Generation::chat("openai", self.config.model.clone(), vec![input])
                    .with_completion(output),
            )
            .finish();
        llm_step.start_time = started;

        self.record(&run.with_output(json!({ "transcribedText": text })).finish());
        self.record(&llm_step);
        info!(chars = text.len(), "audio transcribed");
        Ok(text)
    }

    fn record(&self, step: &Step) {
        record_or_warn(self.recorder.as_deref(), step);
    }
}
