//! Greedy, order-preserving batching of file records under a token budget.

use crate::{
    error::{RepoDigestError, Result},
    scan::FileRecord,
};

/// Consecutive records whose combined estimated tokens fit one prompt.
///
/// A batch holding a single record may exceed the budget when that record is
/// larger than the budget by itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    files: Vec<FileRecord>,
    total_tokens: usize,
}

impl Batch {
    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Renders the batch as `// <path>` headed source blocks separated by a blank line.
    pub fn render(&self) -> String {
        self.files
            .iter()
            .map(|file| format!("// {}\n{}", file.path(), file.content()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Splits `records` into batches of at most `max_tokens_per_batch` estimated
/// tokens, keeping input order within and across batches.
pub fn pack<I>(records: I, max_tokens_per_batch: usize) -> Result<Vec<Batch>>
where
    I: IntoIterator<Item = FileRecord>,
{
    if max_tokens_per_batch == 0 {
        return Err(RepoDigestError::invalid_config(
            "max_tokens_per_batch must be greater than zero",
        ));
    }

    let mut batches = Vec::new();
    let mut current: Vec<FileRecord> = Vec::new();
    let mut running_total = 0usize;

    for record in records {
        let tokens = record.token_count();
        if !current.is_empty() && running_total.saturating_add(tokens) > max_tokens_per_batch {
            batches.push(Batch {
                files: std::mem::take(&mut current),
                total_tokens: running_total,
            });
            running_total = 0;
        }

        current.push(record);
        running_total = running_total.saturating_add(tokens);
    }

    if !current.is_empty() {
        batches.push(Batch {
            files: current,
            total_tokens: running_total,
        });
    }

    Ok(batches)
}
