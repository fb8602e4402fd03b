use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
    time::{SystemTime, UNIX_EPOCH},
};

use regex::Regex;
use tokio::{fs, process::Command};
use tracing::{info, warn};

use crate::error::{RepoDigestError, Result};

static GITHUB_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https://github\.com/([\w.-]+)/([\w.-]+?)(\.git)?$")
        .expect("GITHUB_URL_RE regex should compile")
});

/// A validated GitHub repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    url: String,
    owner: String,
    name: String,
}

impl RepoUrl {
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        let captures = GITHUB_URL_RE
            .captures(trimmed)
            .ok_or_else(|| RepoDigestError::InvalidRepoUrl(url.to_string()))?;

        let owner = captures[1].to_string();
        let name = captures[2].to_string();
        if name.is_empty() || name == "." || name == ".." {
            return Err(RepoDigestError::InvalidRepoUrl(url.to_string()));
        }

        Ok(Self {
            url: trimmed.to_string(),
            owner,
            name,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Where the repository to digest comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoSource {
    Remote(RepoUrl),
    Local(PathBuf),
}

impl RepoSource {
    /// Interprets `input` as a GitHub URL when it looks like one, otherwise
    /// as a local directory.
    pub fn parse(input: &str) -> Result<Self> {
        if input.trim_start().starts_with("http://") || input.trim_start().starts_with("https://")
        {
            return RepoUrl::parse(input).map(Self::Remote);
        }
        Ok(Self::Local(PathBuf::from(input)))
    }

    /// Stable key used for result caching.
    pub fn cache_key(&self) -> String {
        match self {
            Self::Remote(url) => url.as_str().to_string(),
            Self::Local(path) => std::fs::canonicalize(path)
                .unwrap_or_else(|_| path.clone())
                .display()
                .to_string(),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Self::Remote(url) => format!("{}/{}", url.owner(), url.name()),
            Self::Local(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

/// Materializes remote repositories as local directories with `git clone`.
#[derive(Debug, Clone)]
pub struct GitCloner {
    work_root: PathBuf,
}

impl GitCloner {
    pub fn new(work_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
        }
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Shallow-clones `url` into a fresh directory under the work root.
    pub async fn clone_repo(&self, url: &RepoUrl) -> Result<PathBuf> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let target = self.work_root.join(format!("{}-{stamp}", url.name()));

        fs::create_dir_all(&self.work_root).await.map_err(|e| {
            RepoDigestError::io(
                format!("creating clone work root '{}'", self.work_root.display()),
                e,
            )
        })?;

        info!(repo = url.as_str(), target = %target.display(), "clone_start");
        let output = Command::new("git")
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--quiet")
            .arg(url.as_str())
            .arg(&target)
            .output()
            .await
            .map_err(|e| RepoDigestError::Clone(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(repo = url.as_str(), status = %output.status, "clone_failed");
            return Err(RepoDigestError::Clone(format!(
                "git clone of {} exited with {}: {}",
                url.as_str(),
                output.status,
                stderr.trim()
            )));
        }

        info!(repo = url.as_str(), target = %target.display(), "clone_complete");
        Ok(target)
    }

    /// Removes a clone previously produced by [`GitCloner::clone_repo`].
    pub async fn cleanup(&self, clone_dir: &Path) -> Result<()> {
        if !clone_dir.starts_with(&self.work_root) {
            return Err(RepoDigestError::InvalidState(format!(
                "refusing to remove '{}' outside work root '{}'",
                clone_dir.display(),
                self.work_root.display()
            )));
        }
        fs::remove_dir_all(clone_dir).await.map_err(|e| {
            RepoDigestError::io(format!("removing clone '{}'", clone_dir.display()), e)
        })
    }
}
