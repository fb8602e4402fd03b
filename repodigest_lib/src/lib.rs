//! Repository digests: pick the most relevant files of a source tree under a
//! token budget, batch them for a language model, and turn the batch
//! summaries into an architecture overview and a README.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

pub mod cache;
pub mod config;
pub mod error;
pub mod languages;
pub mod llm;
pub mod packer;
pub mod repo;
pub mod report;
pub mod scan;
pub mod selector;
pub mod tokens;
mod workflow;

pub use cache::{FileCache, MemoryCache, ResultCache};
pub use config::{CacheConfig, RepoDigestConfig, SelectionConfig, SelectionMode};
pub use error::{RepoDigestError, Result};
pub use llm::{OllamaWrapper, Summarizer, Task};
pub use packer::{Batch, pack};
pub use repo::{GitCloner, RepoSource, RepoUrl};
pub use report::ReportWriter;
pub use scan::{FileRecord, ScanPolicy, ScanReport, ScanStats, ScoreWeights, scan};
pub use selector::TopKSelector;
pub use workflow::{DigestResult, Progress, ProgressEvent};

pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}

pub struct RepoDigest<S: Summarizer + 'static = OllamaWrapper> {
    config: RepoDigestConfig,
    summarizer: Arc<S>,
    cache: Option<Arc<dyn ResultCache>>,
}

impl RepoDigest<OllamaWrapper> {
    /// Builds a digester backed by Ollama and the cache described in `config`.
    pub fn new(config: RepoDigestConfig) -> Result<Self> {
        let summarizer = OllamaWrapper::with_config(config.ollama.clone())?;
        let digest = Self::with_summarizer(config, summarizer)?;
        let cache: Option<Arc<dyn ResultCache>> = match (
            digest.config.cache.enabled,
            digest.config.cache.path.clone(),
        ) {
            (false, _) => None,
            (true, Some(path)) => Some(Arc::new(FileCache::new(path))),
            (true, None) => Some(Arc::new(MemoryCache::new())),
        };
        Ok(Self { cache, ..digest })
    }
}

impl<S: Summarizer + 'static> RepoDigest<S> {
    /// Builds a digester around any summarization backend, without a cache.
    pub fn with_summarizer(config: RepoDigestConfig, summarizer: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            summarizer: Arc::new(summarizer),
            cache: None,
        })
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    pub fn config(&self) -> &RepoDigestConfig {
        &self.config
    }

    pub async fn run(&self, source: &RepoSource, progress: &Progress) -> Result<DigestResult> {
        workflow::run_digest(
            &self.config,
            &self.summarizer,
            self.cache.as_ref(),
            source,
            progress,
        )
        .await
    }
}
