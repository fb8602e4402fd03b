mod client;
mod config;
pub mod prompts;
mod task;
mod utils;

use std::future::Future;

pub use client::OllamaWrapper;
pub use config::{OllamaConfig, TaskConfig, TaskProfiles};
pub use task::Task;

use crate::error::Result;

/// Text generation backend used by the digest pipeline.
///
/// Implementations receive a fully built prompt and return cleaned Markdown.
pub trait Summarizer: Send + Sync {
    fn generate(&self, task: Task, prompt: String) -> impl Future<Output = Result<String>> + Send;
}
