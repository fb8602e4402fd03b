use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{RepoDigestError, Result},
    llm::OllamaConfig,
    scan::{ScanPolicy, ScoreWeights},
    selector::TopKSelector,
};

/// How scanned records are narrowed down before batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Keep only the `top_k` highest-scoring files.
    #[default]
    TopK,
    /// Keep every accepted file, ordered by score.
    All,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub mode: SelectionMode,
    pub top_k: usize,
    pub max_tokens_per_batch: usize,
    /// Batches summarized together per window.
    pub concurrency: usize,
}

impl SelectionConfig {
    pub fn selector(&self) -> TopKSelector {
        match self.mode {
            SelectionMode::TopK => TopKSelector::new(self.top_k),
            SelectionMode::All => TopKSelector::unbounded(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            mode: SelectionMode::TopK,
            top_k: 20,
            max_tokens_per_batch: 500,
            concurrency: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    #[serde(rename = "ttl_secs", with = "secs")]
    pub ttl: Duration,
    /// JSON file backing the cache; in-memory when absent.
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(600),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RepoDigestConfig {
    pub scan: ScanPolicy,
    pub selection: SelectionConfig,
    pub scoring: ScoreWeights,
    pub cache: CacheConfig,
    pub ollama: OllamaConfig,
    /// Directory that receives repository clones.
    pub work_dir: PathBuf,
    pub keep_clones: bool,
}

impl Default for RepoDigestConfig {
    fn default() -> Self {
        Self {
            scan: ScanPolicy::default(),
            selection: SelectionConfig::default(),
            scoring: ScoreWeights::default(),
            cache: CacheConfig::default(),
            ollama: OllamaConfig::default(),
            work_dir: std::env::temp_dir().join("repodigest"),
            keep_clones: false,
        }
    }
}

impl RepoDigestConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RepoDigestError::io(format!("reading config '{}'", path.display()), e)
        })?;
        Self::from_json_str(&content).map_err(|err| match err {
            RepoDigestError::InvalidConfig(detail) => {
                RepoDigestError::InvalidConfig(format!("{}: {detail}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| RepoDigestError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make a run degenerate.
    pub fn validate(&self) -> Result<()> {
        if self.selection.max_tokens_per_batch == 0 {
            return Err(RepoDigestError::invalid_config(
                "selection.max_tokens_per_batch must be greater than zero",
            ));
        }
        if self.selection.concurrency == 0 {
            return Err(RepoDigestError::invalid_config(
                "selection.concurrency must be greater than zero",
            ));
        }
        self.ollama.base_url()?;
        if self.ollama.max_in_flight == 0 {
            return Err(RepoDigestError::invalid_config(
                "ollama.max_in_flight must be greater than zero",
            ));
        }
        self.scoring.validate()
    }
}

/// Durations given in whole seconds.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

pub(crate) mod optional_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|secs| secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RepoDigestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.selection.top_k, 20);
        assert_eq!(config.cache.ttl, Duration::from_secs(600));
    }

    #[test]
    fn zero_token_budget_is_rejected() {
        let err = RepoDigestConfig::from_json_str(r#"{"selection": {"max_tokens_per_batch": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, RepoDigestError::InvalidConfig(_)));
    }

    #[test]
    fn zero_top_k_is_allowed() {
        let config = RepoDigestConfig::from_json_str(r#"{"selection": {"top_k": 0}}"#).unwrap();
        assert_eq!(config.selection.selector().capacity(), 0);
    }

    #[test]
    fn all_mode_uses_unbounded_selector() {
        let config =
            RepoDigestConfig::from_json_str(r#"{"selection": {"mode": "all"}}"#).unwrap();
        assert_eq!(config.selection.selector().capacity(), usize::MAX);
    }

    #[test]
    fn loads_from_file_with_rules() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repodigest.json");
        fs::write(
            &path,
            r#"{
                "scan": {"skip_dirs": ["vendor", {"regex": "^\\."}], "max_depth": 4},
                "scoring": {"priority_bonus": 50},
                "cache": {"ttl_secs": 30, "path": "cache.json"}
            }"#,
        )
        .unwrap();

        let config = RepoDigestConfig::from_json_file(&path).unwrap();
        assert!(config.scan.skips_dir("vendor"));
        assert!(config.scan.skips_dir(".venv"));
        assert_eq!(config.scan.max_depth, Some(4));
        assert_eq!(config.scoring.priority_bonus, 50.0);
        assert_eq!(config.scoring.token_divisor, 100.0);
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
        assert_eq!(config.cache.path, Some(PathBuf::from("cache.json")));
    }

    #[test]
    fn ollama_host_must_parse_as_url() {
        for host in ["localhost", "http://", "http://["] {
            let json = format!(r#"{{"ollama": {{"host": "{host}"}}}}"#);
            let err = RepoDigestConfig::from_json_str(&json).unwrap_err();
            assert!(matches!(err, RepoDigestError::InvalidConfig(_)), "{host}");
        }
    }

    #[test]
    fn bad_rule_in_file_is_a_config_error() {
        let err = RepoDigestConfig::from_json_str(r#"{"scan": {"skip_names": [{"regex": "("}]}}"#)
            .unwrap_err();
        assert!(matches!(err, RepoDigestError::InvalidConfig(_)));
    }
}
