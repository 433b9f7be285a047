//! Image generation recipe: generate, download, attach.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::llm::openai::OpenAiClient;
use crate::trace::{record_or_warn, Attachment, Step, StepRecorder, StepType};
use crate::{AppError, Result};

/// Name of the run wrapping an interactive image session.
pub const RUN_NAME: &str = "Simple Dall-E";

const STEP_NAME: &str = "Generation";

/// Generates images and stores them under a local directory.
pub struct ImageRecipe {
    client: OpenAiClient,
    size: String,
    images_dir: PathBuf,
    recorder: Option<Arc<dyn StepRecorder>>,
}

impl ImageRecipe {
    /// Create a recipe writing `size` images into `images_dir`.
    #[must_use]
    pub fn new(client: OpenAiClient, size: String, images_dir: PathBuf) -> Self {
        Self {
            client,
            size,
            images_dir,
            recorder: None,
        }
    }

    /// Record generation steps to `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn StepRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Start the run step that groups a session of generations.
    #[must_use]
    pub fn start_run(&self) -> Step {
        Step::new(RUN_NAME, StepType::Run)
    }

    /// Close and record a run started with [`ImageRecipe::start_run`].
    pub fn finish_run(&self, run: Step, generated: usize) {
        let run = run.with_output(json!({ "generated": generated })).finish();
        record_or_warn(self.recorder.as_deref(), &run);
    }

    /// Generate one image for `prompt` and return its local path.
    ///
    /// The generation is recorded as an `llm` step under `run_id` with the
    /// stored PNG attached.
    ///
    /// # Errors
    ///
    /// Returns the API, download or file-system error; the step is still
    /// recorded with the error text.
    pub async fn generate(&self, prompt: &str, run_id: Option<&str>) -> Result<PathBuf> {
        let mut step = Step::new(STEP_NAME, StepType::Llm).with_input(json!({ "prompt": prompt }));
        if let Some(run_id) = run_id {
            step = step.with_parent(run_id.to_owned());
        }

        match self.generate_and_store(prompt).await {
            Ok((path, response)) => {
                let step = step
                    .with_output(response)
                    .with_attachment(Attachment::new(
                        "result",
                        "image/png",
                        path.display().to_string(),
                    ))
                    .finish();
                record_or_warn(self.recorder.as_deref(), &step);
                info!(path = %path.display(), "image stored");
                Ok(path)
            }
            Err(err) => {
                record_or_warn(
                    self.recorder.as_deref(),
                    &step.with_error(err.to_string()).finish(),
                );
                Err(err)
            }
        }
    }

    async fn generate_and_store(&self, prompt: &str) -> Result<(PathBuf, serde_json::Value)> {
        let image = self.client.generate_image(prompt, &self.size).await?;
        let content = self.client.download(&image.url).await?;
        let path = store_png(&self.images_dir, &content).await?;
        Ok((path, image.response))
    }
}

/// Write `content` to `<dir>/<unix-millis>.png`.
async fn store_png(dir: &Path, content: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|err| AppError::Io(format!("failed to create {}: {err}", dir.display())))?;
    let path = dir.join(format!("{}.png", Utc::now().timestamp_millis()));
    tokio::fs::write(&path, content)
        .await
        .map_err(|err| AppError::Io(format!("failed to write {}: {err}", path.display())))?;
    Ok(path)
}
