mod generate;
mod ingest;
mod types;

use std::{path::PathBuf, sync::Arc};

use tracing::{info, warn};

use crate::{
    cache::ResultCache,
    config::RepoDigestConfig,
    error::{RepoDigestError, Result},
    llm::Summarizer,
    repo::{GitCloner, RepoSource},
};

pub use types::{DigestResult, Progress, ProgressEvent};

/// Runs cache lookup, acquisition, selection, batching and the three
/// generation stages for one repository.
pub(crate) async fn run_digest<S>(
    config: &RepoDigestConfig,
    summarizer: &Arc<S>,
    cache: Option<&Arc<dyn ResultCache>>,
    source: &RepoSource,
    progress: &Progress,
) -> Result<DigestResult>
where
    S: Summarizer + 'static,
{
    config.validate()?;
    let cache_key = source.cache_key();

    if let Some(cached) = lookup_cached(cache, &cache_key).await {
        info!(repo = %cache_key, "result served from cache");
        progress.emit(ProgressEvent::Cache {
            message: "Result served from cache".to_string(),
        });
        progress.emit(ProgressEvent::Done {
            message: "Digest complete".to_string(),
        });
        return Ok(cached);
    }

    let (root, clone_dir) = materialize(config, source, progress).await?;
    let outcome = digest_tree(config, summarizer, source, &root, progress).await;

    if let Some(clone_dir) = clone_dir {
        let cloner = GitCloner::new(&config.work_dir);
        if let Err(err) = cloner.cleanup(&clone_dir).await {
            warn!(clone_dir = %clone_dir.display(), error = %err, "failed removing clone; continuing");
        }
    }

    let result = outcome?;

    if let Some(cache) = cache
        && !result.batch_summaries.is_empty()
    {
        store_cached(cache, &cache_key, &result, config).await;
    }

    progress.emit(ProgressEvent::Done {
        message: "Digest complete".to_string(),
    });
    Ok(result)
}

/// Returns the directory to scan and, for fresh clones, the directory to remove afterwards.
async fn materialize(
    config: &RepoDigestConfig,
    source: &RepoSource,
    progress: &Progress,
) -> Result<(PathBuf, Option<PathBuf>)> {
    match source {
        RepoSource::Local(path) => Ok((path.clone(), None)),
        RepoSource::Remote(url) => {
            let cloner = GitCloner::new(&config.work_dir);
            let target = cloner.clone_repo(url).await?;
            progress.emit(ProgressEvent::Clone {
                message: "Cloning complete".to_string(),
            });
            let cleanup = (!config.keep_clones).then(|| target.clone());
            Ok((target, cleanup))
        }
    }
}

async fn digest_tree<S>(
    config: &RepoDigestConfig,
    summarizer: &Arc<S>,
    source: &RepoSource,
    root: &std::path::Path,
    progress: &Progress,
) -> Result<DigestResult>
where
    S: Summarizer + 'static,
{
    let project_name = source.display_name();
    let ingested = ingest::select_and_pack(root, config).await?;
    let languages: Vec<String> = ingested.stats.languages.iter().cloned().collect();

    progress.emit(ProgressEvent::Read {
        message: "Files read successfully".to_string(),
        files_accepted: ingested.stats.files_accepted,
        files_selected: ingested.selected_files.len(),
    });
    progress.emit(ProgressEvent::Pack {
        batches: ingested.batches.len(),
    });

    let mut result = DigestResult {
        repo: source.cache_key(),
        languages,
        selected_files: ingested.selected_files,
        batch_count: ingested.batches.len(),
        batch_summaries: Vec::new(),
        architecture: String::new(),
        readme: String::new(),
        scan: ingested.stats,
    };

    if ingested.batches.is_empty() {
        warn!(
            project = %project_name,
            "no source files selected, skipping generation"
        );
        return Ok(result);
    }

    result.batch_summaries = generate::summarize_batches(
        summarizer,
        &ingested.batches,
        config.selection.concurrency,
        progress,
    )
    .await?;

    result.architecture =
        generate::generate_architecture(summarizer.as_ref(), &project_name, &result.batch_summaries)
            .await?;
    progress.emit(ProgressEvent::Architecture {
        message: "Architecture overview generated".to_string(),
    });

    result.readme = generate::generate_readme(
        summarizer.as_ref(),
        &project_name,
        &result.languages,
        &result.architecture,
    )
    .await?;
    progress.emit(ProgressEvent::Readme {
        message: "README generated".to_string(),
    });

    info!(
        project = %project_name,
        batch_count = result.batch_count,
        file_count = result.selected_files.len(),
        "digest generation completed"
    );

    Ok(result)
}

/// Runs a cache call on the blocking pool; cache backends may do file I/O.
async fn on_cache<T, F>(cache: &Arc<dyn ResultCache>, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn ResultCache) -> Result<T> + Send + 'static,
{
    let cache = Arc::clone(cache);
    tokio::task::spawn_blocking(move || call(cache.as_ref()))
        .await
        .map_err(|e| RepoDigestError::Cache(format!("cache task failed: {e}")))?
}

async fn lookup_cached(cache: Option<&Arc<dyn ResultCache>>, key: &str) -> Option<DigestResult> {
    let owned_key = key.to_string();
    let raw = match on_cache(cache?, move |cache| cache.get(&owned_key)).await {
        Ok(raw) => raw?,
        Err(err) => {
            warn!(cache_key = key, error = %err, "cache lookup failed; continuing without cache");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(result) => Some(result),
        Err(err) => {
            warn!(cache_key = key, error = %err, "cached result unreadable; regenerating");
            None
        }
    }
}

async fn store_cached(
    cache: &Arc<dyn ResultCache>,
    key: &str,
    result: &DigestResult,
    config: &RepoDigestConfig,
) {
    let ttl = config.cache.ttl;
    let owned_key = key.to_string();
    let stored = match serde_json::to_string(result) {
        Ok(json) => on_cache(cache, move |cache| cache.set_with_ttl(&owned_key, json, ttl)).await,
        Err(e) => Err(RepoDigestError::Cache(format!(
            "serializing digest result: {e}"
        ))),
    };

    if let Err(err) = stored {
        warn!(cache_key = key, error = %err, "failed caching digest result; continuing");
    }
}
