mod file_walker;
mod policy;
mod record;
mod rules;

use std::{collections::BTreeSet, path::Path};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use crate::{
    error::{RepoDigestError, Result},
    selector::TopKSelector,
};

pub use file_walker::{DEFAULT_MAX_OPEN_FILES, FileWalker};
pub use policy::{DEFAULT_MAX_FILE_SIZE_BYTES, FileVerdict, ScanPolicy};
pub use record::{FileRecord, ScoreWeights};
pub use rules::{Rule, RuleSet, RuleSpec, TaggedRule};

const RECORD_CHANNEL_CAPACITY: usize = 64;

/// Counters gathered while walking a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub directories_visited: usize,
    pub directories_pruned: usize,
    pub directories_unreadable: usize,
    pub files_seen: usize,
    pub files_skipped: usize,
    pub files_oversized: usize,
    pub files_unreadable: usize,
    pub files_accepted: usize,
    /// Languages of every accepted file, not only the selected ones.
    pub languages: BTreeSet<String>,
}

impl ScanStats {
    pub fn merge(&mut self, other: ScanStats) {
        self.directories_visited += other.directories_visited;
        self.directories_pruned += other.directories_pruned;
        self.directories_unreadable += other.directories_unreadable;
        self.files_seen += other.files_seen;
        self.files_skipped += other.files_skipped;
        self.files_oversized += other.files_oversized;
        self.files_unreadable += other.files_unreadable;
        self.files_accepted += other.files_accepted;
        self.languages.extend(other.languages);
    }
}

#[derive(Debug)]
pub struct ScanReport {
    /// Selected records, highest score first.
    pub records: Vec<FileRecord>,
    pub stats: ScanStats,
}

/// Scans `root` under `policy`, feeding every accepted record into `selector`
/// and returning what it retained.
///
/// The selector is owned by a single collector task that receives records
/// over a channel, so concurrent file tasks never touch it directly.
pub async fn scan(
    root: &Path,
    policy: &ScanPolicy,
    weights: ScoreWeights,
    selector: TopKSelector,
) -> Result<ScanReport> {
    weights.validate()?;
    info!(root = %root.display(), capacity = selector.capacity(), "scan_start");

    let walker = FileWalker::with_policy(policy.clone(), weights);
    let (tx, mut rx) = mpsc::channel::<FileRecord>(RECORD_CHANNEL_CAPACITY);

    let collector = tokio::spawn(async move {
        let mut selector = selector;
        while let Some(record) = rx.recv().await {
            selector.offer(record);
        }
        selector
    });

    let walked = walker.walk(root, tx).await;
    let mut selector = collector
        .await
        .map_err(|e| RepoDigestError::InvalidState(format!("selector task failed: {e}")))?;
    let stats = walked?;
    let records = selector.drain();

    info!(
        root = %root.display(),
        files_seen = stats.files_seen,
        files_accepted = stats.files_accepted,
        files_selected = records.len(),
        directories_pruned = stats.directories_pruned,
        "scan_complete"
    );

    Ok(ScanReport { records, stats })
}
