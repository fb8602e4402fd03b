use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    error::{RepoDigestError, Result},
    workflow::DigestResult,
};

/// Writes a digest to disk as Markdown files plus the raw JSON result.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    out_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn batches_dir(&self) -> PathBuf {
        self.out_dir.join("batches")
    }

    pub fn batch_summary_path(&self, index: usize) -> PathBuf {
        self.batches_dir().join(format!("batch-{:03}.md", index + 1))
    }

    pub fn architecture_path(&self) -> PathBuf {
        self.out_dir.join("architecture.md")
    }

    pub fn readme_path(&self) -> PathBuf {
        self.out_dir.join("README.md")
    }

    pub fn digest_path(&self) -> PathBuf {
        self.out_dir.join("digest.json")
    }

    pub fn write(&self, result: &DigestResult) -> Result<()> {
        fs::create_dir_all(self.batches_dir()).map_err(|e| {
            RepoDigestError::io(
                format!("creating report directory '{}'", self.batches_dir().display()),
                e,
            )
        })?;

        for (index, summary) in result.batch_summaries.iter().enumerate() {
            write_file(&self.batch_summary_path(index), summary)?;
        }
        write_file(&self.architecture_path(), &result.architecture)?;
        write_file(&self.readme_path(), &result.readme)?;

        let json = serde_json::to_string_pretty(result)
            .map_err(|e| RepoDigestError::InvalidState(format!("serializing digest: {e}")))?;
        write_file(&self.digest_path(), &json)?;

        info!(
            out_dir = %self.out_dir.display(),
            batch_count = result.batch_summaries.len(),
            "report written"
        );
        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .map_err(|e| RepoDigestError::io(format!("writing report file '{}'", path.display()), e))
}
