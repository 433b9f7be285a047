//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when connecting to or bootstrapping `SQLite`.
    Db(String),
    /// A submitted SQL statement was rejected by the query executor.
    ///
    /// Carries the underlying database diagnostic unchanged.
    Query(String),
    /// Language-model API failure (bad status, error body, empty reply).
    Llm(String),
    /// HTTP transport failure.
    Http(String),
    /// Step recording failure.
    Trace(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::Query(msg) => write!(f, "query: {msg}"),
            Self::Llm(msg) => write!(f, "llm: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
            Self::Trace(msg) => write!(f, "trace: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
