#![forbid(unsafe_code)]

//! AI API recipes with local step tracing.
//!
//! The [`resolver`] module holds the natural-language-to-SQL loop; the
//! [`recipes`] module holds the image generation and transcription flows.

pub mod config;
pub mod errors;
pub mod llm;
pub mod models;
pub mod persistence;
pub mod recipes;
pub mod resolver;
pub mod trace;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
