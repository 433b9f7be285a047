//! Step tracing for recipe runs.
//!
//! Provides the [`StepRecorder`] trait and associated types. The primary
//! implementation, [`JsonlStepWriter`], appends JSONL records to
//! daily-rotating files in `.cookbook/steps/`.

pub mod writer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::message::ConversationMessage;

/// Classification of a traced step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Top-level run wrapping a whole recipe invocation.
    Run,
    /// Call to a model endpoint.
    Llm,
    /// Application-side operation such as a database query.
    Tool,
}

/// File attached to a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// Display name.
    pub name: String,
    /// MIME type of the content.
    pub mime: String,
    /// Local path of the stored file.
    pub path: String,
}

impl Attachment {
    /// Construct an attachment record.
    #[must_use]
    pub fn new(name: impl Into<String>, mime: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            path: path.into(),
        }
    }
}

/// Model call metadata recorded on `llm` steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Generation {
    /// Generation shape, `CHAT` or `COMPLETION`.
    #[serde(rename = "type")]
    pub kind: String,
    /// API provider name.
    pub provider: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature, when one was sent.
    pub temperature: Option<f32>,
    /// Prompt messages.
    pub messages: Vec<ConversationMessage>,
    /// Message produced by the model.
    pub message_completion: Option<ConversationMessage>,
}

impl Generation {
    /// Construct a chat generation record.
    #[must_use]
    pub fn chat(
        provider: impl Into<String>,
        model: impl Into<String>,
        messages: Vec<ConversationMessage>,
    ) -> Self {
        Self {
            kind: "CHAT".into(),
            provider: provider.into(),
            model: model.into(),
            temperature: None,
            messages,
            message_completion: None,
        }
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion message.
    #[must_use]
    pub fn with_completion(mut self, completion: ConversationMessage) -> Self {
        self.message_completion = Some(completion);
        self
    }
}

/// A structured record of one unit of traced work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique step identifier.
    pub id: String,
    /// Enclosing step, if any.
    pub parent_id: Option<String>,
    /// Conversation thread this step belongs to.
    pub thread_id: Option<String>,
    /// Human-readable step name.
    pub name: String,
    /// Step classification.
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Step input payload.
    pub input: Option<serde_json::Value>,
    /// Step output payload.
    pub output: Option<serde_json::Value>,
    /// Error text when the step failed.
    pub error: Option<String>,
    /// Start timestamp.
    pub start_time: DateTime<Utc>,
    /// End timestamp.
    pub end_time: Option<DateTime<Utc>>,
    /// Attached files.
    pub attachments: Vec<Attachment>,
    /// Model call metadata for `llm` steps.
    pub generation: Option<Generation>,
}

impl Step {
    /// Start a new step of the given type now.
    #[must_use]
    pub fn new(name: impl Into<String>, step_type: StepType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            parent_id: None,
            thread_id: None,
            name: name.into(),
            step_type,
            input: None,
            output: None,
            error: None,
            start_time: Utc::now(),
            end_time: None,
            attachments: Vec::new(),
            generation: None,
        }
    }

    /// Use a caller-supplied identifier instead of a generated one.
    #[must_use]
    pub fn with_id(mut self, id: String) -> Self {
        self.id = id;
        self
    }

    /// Nest this step under `parent_id`.
    #[must_use]
    pub fn with_parent(mut self, parent_id: String) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Attach this step to a thread.
    #[must_use]
    pub fn with_thread(mut self, thread_id: String) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Set the input payload.
    #[must_use]
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Set the output payload.
    #[must_use]
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    /// Record a failure.
    #[must_use]
    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    /// Add an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Set the generation metadata.
    #[must_use]
    pub fn with_generation(mut self, generation: Generation) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Mark the step finished now.
    #[must_use]
    pub fn finish(mut self) -> Self {
        self.end_time = Some(Utc::now());
        self
    }
}

/// Writes finished steps to a persistent store.
///
/// Implementations must be [`Send`] and [`Sync`] to allow sharing across
/// async task boundaries via [`std::sync::Arc`].
pub trait StepRecorder: Send + Sync {
    /// Record a single step.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write operation fails.
    fn record(&self, step: &Step) -> crate::Result<()>;
}

/// Record `step`, logging instead of failing when the recorder errors.
///
/// Tracing never changes the outcome of the traced operation.
pub fn record_or_warn(recorder: Option<&dyn StepRecorder>, step: &Step) {
    if let Some(recorder) = recorder {
        if let Err(err) = recorder.record(step) {
            tracing::warn!(step = %step.name, %err, "failed to record step");
        }
    }
}

pub use writer::JsonlStepWriter;
