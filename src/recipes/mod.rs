//! End-to-end demo flows built on the API client and step recorder.

pub mod image;
pub mod transcribe;

pub use image::ImageRecipe;
pub use transcribe::TranscriptionRecipe;
