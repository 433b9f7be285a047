//! Language-model client abstraction.
//!
//! The [`LanguageModel`] trait decouples the resolver from the transport
//! used to obtain completions. [`openai::OpenAiClient`] is the HTTP
//! implementation; tests substitute scripted models.

pub mod openai;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::models::message::ConversationMessage;
use crate::Result;

/// A chat completion request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered conversation so far.
    pub messages: Vec<ConversationMessage>,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Produces text completions for a conversation.
pub trait LanguageModel: Send + Sync {
    /// Return the completion text for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Llm`](crate::AppError::Llm) or
    /// [`AppError::Http`](crate::AppError::Http) on upstream failure.
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Provider name recorded on traced generations.
    fn provider(&self) -> &str;
}

pub use openai::OpenAiClient;
