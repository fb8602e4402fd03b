use std::path::Path;

use tracing::info;

use crate::{
    config::RepoDigestConfig,
    error::Result,
    packer::{self, Batch},
    scan::{self, ScanStats},
};

pub(crate) struct Ingested {
    pub batches: Vec<Batch>,
    pub selected_files: Vec<String>,
    pub stats: ScanStats,
}

/// Scans `root`, keeps the configured selection, and packs it into batches.
pub(crate) async fn select_and_pack(root: &Path, config: &RepoDigestConfig) -> Result<Ingested> {
    let report = scan::scan(
        root,
        &config.scan,
        config.scoring,
        config.selection.selector(),
    )
    .await?;

    let selected_files = report
        .records
        .iter()
        .map(|record| record.path().to_string())
        .collect::<Vec<_>>();

    let batches = packer::pack(report.records, config.selection.max_tokens_per_batch)?;
    info!(
        files_selected = selected_files.len(),
        batch_count = batches.len(),
        max_tokens_per_batch = config.selection.max_tokens_per_batch,
        "batches_packed"
    );

    Ok(Ingested {
        batches,
        selected_files,
        stats: report.stats,
    })
}
