//! Shared helpers for integration tests.
//!
//! Provides a scripted language model, a seeded in-memory database, and a
//! local HTTP server standing in for the OpenAI API.

use std::collections::VecDeque;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use ai_cookbook::llm::{CompletionRequest, LanguageModel};
use ai_cookbook::models::message::ConversationMessage;
use ai_cookbook::persistence::{db, seed};
use ai_cookbook::{AppError, Result};

/// Language model replying from a fixed script and recording each request.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    /// Reply with `replies` in order; the last reply repeats once exhausted.
    pub fn new<I, S>(replies: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Fail every call with `AppError::Llm(message)`.
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err(AppError::Llm(message.to_owned()))])),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Conversation length seen by each call, in order.
    pub fn message_counts(&self) -> Vec<usize> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.messages.len())
            .collect()
    }

    /// Messages sent on call `index` (zero-based).
    pub fn messages_at(&self, index: usize) -> Vec<ConversationMessage> {
        self.requests.lock().unwrap()[index].messages.clone()
    }

    /// Full request sent on call `index` (zero-based).
    #[allow(dead_code)]
    pub fn request_at(&self, index: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    fn next_reply(&self) -> Result<String> {
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().map(|r| match r {
                Ok(text) => Ok(text.clone()),
                Err(err) => Err(AppError::Llm(err.to_string())),
            })
        };
        reply.unwrap_or_else(|| Err(AppError::Llm("script exhausted".into())))
    }
}

impl LanguageModel for ScriptedModel {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.next_reply();
        Box::pin(async move { reply })
    }

    fn provider(&self) -> &str {
        "scripted"
    }
}

/// In-memory database with schema and demo data.
pub async fn seeded_db() -> Arc<db::Database> {
    let pool = db::connect_memory().await.expect("db connect");
    seed::seed_demo_data(&pool).await.expect("seed");
    Arc::new(pool)
}

/// Serve `app` on an ephemeral local port and return its base URL.
#[allow(dead_code)]
pub async fn spawn_server(listener: tokio::net::TcpListener, app: axum::Router) -> String {
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

/// Bind an ephemeral local port.
#[allow(dead_code)]
pub async fn bind_local() -> tokio::net::TcpListener {
    tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind")
}

/// Parse every JSONL line under `dir`.
#[allow(dead_code)]
pub fn read_steps(dir: &Path) -> Vec<serde_json::Value> {
    let mut steps = Vec::new();
    for entry in std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(std::result::Result::ok)
    {
        let text = std::fs::read_to_string(entry.path()).expect("read file");
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            steps.push(serde_json::from_str(line).expect("valid json line"));
        }
    }
    steps
}
