//! Natural-language-to-SQL resolution.
//!
//! [`Resolver::resolve`] asks a [`LanguageModel`] for a query, runs it
//! through a [`QueryExecutor`], and on failure feeds the rejected
//! completion back with a corrective instruction. The loop stops after
//! [`MAX_ATTEMPTS`] tries and returns the last executor error unchanged.

pub mod extract;
pub mod prompt;

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use crate::llm::{CompletionRequest, LanguageModel};
use crate::models::message::ConversationMessage;
use crate::models::query::QueryResult;
use crate::persistence::executor::QueryExecutor;
use crate::trace::{record_or_warn, Generation, Step, StepRecorder, StepType};
use crate::{AppError, Result};

pub use extract::extract_sql;

/// Attempt ceiling for a single resolution.
pub const MAX_ATTEMPTS: u32 = 5;

/// Chat model used when none is configured.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Sampling temperature used when none is configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.25;
const STEP_NAME: &str = "queryDatabase";

/// Translates requests into SQL and validates them by execution.
pub struct Resolver {
    model: Arc<dyn LanguageModel>,
    executor: Arc<dyn QueryExecutor>,
    schema: String,
    chat_model: String,
    temperature: f32,
    recorder: Option<Arc<dyn StepRecorder>>,
}

impl Resolver {
    /// Create a resolver grounded in `schema` (concatenated DDL text).
    #[must_use]
    pub fn new(
        model: Arc<dyn LanguageModel>,
        executor: Arc<dyn QueryExecutor>,
        schema: String,
    ) -> Self {
        Self {
            model,
            executor,
            schema,
            chat_model: DEFAULT_CHAT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            recorder: None,
        }
    }

    /// Override the chat model and sampling temperature.
    #[must_use]
    pub fn with_model_settings(mut self, chat_model: String, temperature: f32) -> Self {
        self.chat_model = chat_model;
        self.temperature = temperature;
        self
    }

    /// Record resolution and generation steps to `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn StepRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Resolve `request` into an executed query.
    ///
    /// `expected_columns`, when given, is appended to the request so the
    /// model shapes its output accordingly.
    ///
    /// # Errors
    ///
    /// Returns the language model's error immediately if a completion
    /// fails. Returns the last [`AppError::Query`] unchanged if no
    /// attempt produced an executable query within [`MAX_ATTEMPTS`].
    pub async fn resolve(
        &self,
        request: &str,
        expected_columns: Option<&[String]>,
    ) -> Result<QueryResult> {
        let step = Step::new(STEP_NAME, StepType::Tool)
            .with_input(json!({ "query": request, "columnNames": expected_columns }));

        let mut completion_request = CompletionRequest {
            model: self.chat_model.clone(),
            messages: prompt::initial_conversation(&self.schema, request, expected_columns),
            temperature: self.temperature,
        };
        let mut last_error = AppError::Query("no attempt was made".into());

        for attempt in 1..=MAX_ATTEMPTS {
            let completion = match self.model.complete(&completion_request).await {
                Ok(text) => text,
                Err(err) => {
                    self.record(&step.with_error(err.to_string()).finish());
                    return Err(err);
                }
            };
            self.record_generation(&step.id, &completion_request, &completion);

            let sql = extract_sql(&completion);
            match self.executor.execute(sql).await {
                Ok(result) => {
                    info!(attempt, rows = result.len(), "query resolved");
                    let outcome = QueryResult {
                        query: sql.to_owned(),
                        attempts: attempt,
                        result,
                    };
                    let output = serde_json::to_value(&outcome).unwrap_or_default();
                    self.record(&step.with_output(output).finish());
                    return Ok(outcome);
                }
                Err(err) => {
                    warn!(attempt, %err, "generated query rejected");
                    completion_request
                        .messages
                        .extend(prompt::retry_messages(&completion));
                    last_error = err;
                }
            }
        }

        self.record(&step.with_error(last_error.to_string()).finish());
        Err(last_error)
    }

    fn record(&self, step: &Step) {
        record_or_warn(self.recorder.as_deref(), step);
    }

    fn record_generation(&self, parent_id: &str, request: &CompletionRequest, completion: &str) {
        if self.recorder.is_none() {
            return;
        }
        let generation = Generation::chat(
            self.model.provider(),
            request.model.clone(),
            request.messages.clone(),
        )
        .with_temperature(request.temperature)
        .with_completion(ConversationMessage::assistant(completion));

        let step = Step::new(request.model.clone(), StepType::Llm)
            .with_parent(parent_id.to_owned())
            .with_input(json!({ "messages": request.messages }))
            .with_output(json!({ "content": completion }))
            .with_generation(generation)
            .finish();
        self.record(&step);
    }
}
