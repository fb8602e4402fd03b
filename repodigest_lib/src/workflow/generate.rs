use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::{
    error::{RepoDigestError, Result},
    llm::{Summarizer, Task, prompts},
    packer::Batch,
};

use super::types::{Progress, ProgressEvent};

/// Summarizes every batch, `window` batches at a time, preserving batch order
/// in the returned summaries. The first failing batch aborts the run.
pub(crate) async fn summarize_batches<S>(
    summarizer: &Arc<S>,
    batches: &[Batch],
    window: usize,
    progress: &Progress,
) -> Result<Vec<String>>
where
    S: Summarizer + 'static,
{
    let total = batches.len();
    info!(batch_count = total, window, "batch_summary_phase_start");

    let mut summaries = Vec::with_capacity(total);
    let mut completed = 0usize;

    for chunk in batches.chunks(window.max(1)) {
        let start = Instant::now();
        let mut tasks = JoinSet::new();

        for (offset, batch) in chunk.iter().enumerate() {
            let summarizer = Arc::clone(summarizer);
            let prompt = prompts::build_batch_summary_prompt(&batch.render());
            debug!(
                batch_index = completed + offset,
                file_count = batch.len(),
                total_tokens = batch.total_tokens(),
                prompt_bytes = prompt.len(),
                "batch_summary_request"
            );
            tasks.spawn(async move {
                let summary = summarizer.generate(Task::BatchSummary, prompt).await;
                (offset, summary)
            });
        }

        let mut window_results: Vec<Option<String>> = vec![None; chunk.len()];
        while let Some(joined) = tasks.join_next().await {
            let (offset, summary) = joined.map_err(|e| {
                RepoDigestError::InvalidState(format!("batch summary task failed: {e}"))
            })?;
            window_results[offset] = Some(summary?);
        }

        for summary in window_results {
            let summary = summary.ok_or_else(|| {
                RepoDigestError::InvalidState("batch summary missing from window".to_string())
            })?;
            summaries.push(summary);
        }

        completed += chunk.len();
        info!(
            completed,
            total,
            elapsed = %format_duration(start.elapsed()),
            "batch_summary_window_complete"
        );
        progress.emit(ProgressEvent::Analyze {
            progress: format!("Batch {completed}/{total}"),
            completed,
            total,
        });
    }

    Ok(summaries)
}

pub(crate) async fn generate_architecture<S: Summarizer>(
    summarizer: &S,
    project_name: &str,
    batch_summaries: &[String],
) -> Result<String> {
    info!(summary_count = batch_summaries.len(), "generate_architecture");
    let start = Instant::now();
    let prompt = prompts::build_architecture_prompt(project_name, batch_summaries);
    let architecture = summarizer.generate(Task::Architecture, prompt).await?;

    info!(
        elapsed = %format_duration(start.elapsed()),
        architecture_len = architecture.len(),
        "architecture generated"
    );
    Ok(architecture)
}

pub(crate) async fn generate_readme<S: Summarizer>(
    summarizer: &S,
    project_name: &str,
    languages: &[String],
    architecture: &str,
) -> Result<String> {
    info!(language_count = languages.len(), "generate_readme");
    let start = Instant::now();
    let prompt = prompts::build_readme_prompt(project_name, languages, architecture);
    let readme = summarizer.generate(Task::Readme, prompt).await?;

    info!(
        elapsed = %format_duration(start.elapsed()),
        readme_len = readme.len(),
        "readme generated"
    );
    Ok(readme)
}

pub(crate) fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let millis = d.subsec_millis();
    let mins = total_secs / 60;
    let secs = total_secs % 60;

    if mins > 0 {
        format!("{mins}m {secs}s {millis}ms")
    } else if secs > 0 {
        format!("{secs}s {millis}ms")
    } else {
        format!("{millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_durations_compactly() {
        assert_eq!(format_duration(Duration::from_millis(42)), "42ms");
        assert_eq!(format_duration(Duration::from_millis(3_250)), "3s 250ms");
        assert_eq!(format_duration(Duration::from_millis(125_007)), "2m 5s 7ms");
    }
}
