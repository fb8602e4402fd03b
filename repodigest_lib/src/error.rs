use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepoDigestError>;

#[derive(Debug, Error)]
pub enum RepoDigestError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid rule '{rule}': {detail}")]
    InvalidRule { rule: String, detail: String },

    #[error("scan root '{0}' does not exist")]
    RootNotFound(PathBuf),

    #[error("scan root '{0}' is not a directory")]
    RootNotDirectory(PathBuf),

    #[error("invalid repository url '{0}': expected https://github.com/<owner>/<repo>")]
    InvalidRepoUrl(String),

    #[error("clone failed: {0}")]
    Clone(String),

    #[error("llm error: {0}")]
    Llm(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl RepoDigestError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_config(detail: impl Into<String>) -> Self {
        Self::InvalidConfig(detail.into())
    }
}
