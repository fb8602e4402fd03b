use std::time::Duration;

use ollama_rs::models::ModelOptions;
use serde::Deserialize;
use url::Url;

use super::Task;
use crate::{
    config::{optional_secs, secs},
    error::{RepoDigestError, Result},
};

const DEFAULT_MODEL: &str = "phi4-mini:3.8b";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub model: String,
    pub temperature: f32,
    pub num_ctx: u64,
    pub num_predict: i32,
    #[serde(with = "optional_secs")]
    pub generate_timeout: Option<Duration>,
}

impl TaskConfig {
    pub fn options(&self) -> ModelOptions {
        ModelOptions::default()
            .temperature(self.temperature)
            .num_ctx(self.num_ctx)
            .num_predict(self.num_predict)
    }

    fn with_limits(temperature: f32, num_ctx: u64, num_predict: i32) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature,
            num_ctx,
            num_predict,
            generate_timeout: None,
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::with_limits(0.2, 4096, 400)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TaskProfiles {
    pub batch_summary: TaskConfig,
    pub architecture: TaskConfig,
    pub readme: TaskConfig,
}

impl TaskProfiles {
    pub fn for_task(&self, task: Task) -> &TaskConfig {
        match task {
            Task::BatchSummary => &self.batch_summary,
            Task::Architecture => &self.architecture,
            Task::Readme => &self.readme,
        }
    }

    pub fn set_model_for_all(&mut self, model: impl Into<String>) {
        let model = model.into();
        self.batch_summary.model = model.clone();
        self.architecture.model = model.clone();
        self.readme.model = model;
    }
}

impl Default for TaskProfiles {
    fn default() -> Self {
        Self {
            batch_summary: TaskConfig::with_limits(0.2, 4096, 300),
            architecture: TaskConfig::with_limits(0.1, 8192, 1200),
            readme: TaskConfig::with_limits(0.2, 6144, 900),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Scheme and host of the Ollama server, without the port.
    pub host: String,
    pub port: u16,
    /// Upper bound on generation requests in flight at once.
    pub max_in_flight: usize,
    #[serde(with = "secs")]
    pub lock_timeout: Duration,
    pub keep_alive_minutes: u64,
    pub tasks: TaskProfiles,
}

impl OllamaConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.tasks.set_model_for_all(model);
        self
    }

    /// Server URL built from `host` and `port`.
    pub fn base_url(&self) -> Result<Url> {
        let invalid = |detail: String| {
            RepoDigestError::invalid_config(format!("ollama.host '{}' {detail}", self.host))
        };

        let mut url = Url::parse(self.host.trim())
            .map_err(|e| invalid(format!("is not a valid url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("must use http or https".to_string()));
        }
        if !url.has_host() {
            return Err(invalid("has no host name".to_string()));
        }
        url.set_port(Some(self.port))
            .map_err(|()| invalid("does not accept a port".to_string()))?;
        Ok(url)
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".to_string(),
            port: 11434,
            max_in_flight: 3,
            lock_timeout: Duration::from_secs(300),
            keep_alive_minutes: 30,
            tasks: TaskProfiles::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_model_overrides_every_task() {
        let config = OllamaConfig::default().with_model("llama3.2:3b");
        for task in [Task::BatchSummary, Task::Architecture, Task::Readme] {
            assert_eq!(config.tasks.for_task(task).model, "llama3.2:3b");
        }
    }

    #[test]
    fn base_url_combines_host_and_port() {
        let url = OllamaConfig::default().base_url().unwrap();
        assert_eq!(url.as_str(), "http://localhost:11434/");
    }

    #[test]
    fn malformed_hosts_are_rejected() {
        for host in ["localhost", "http://", "http://[", "ftp://models.local", "unix:/run/ollama"] {
            let config = OllamaConfig {
                host: host.to_string(),
                ..OllamaConfig::default()
            };
            assert!(
                matches!(config.base_url(), Err(RepoDigestError::InvalidConfig(_))),
                "{host}"
            );
        }
    }

    #[test]
    fn deserializes_partial_config() {
        let config: OllamaConfig = serde_json::from_str(
            r#"{"max_in_flight": 1, "lock_timeout": 5, "tasks": {"readme": {"model": "m", "generate_timeout": 90}}}"#,
        )
        .unwrap();
        assert_eq!(config.max_in_flight, 1);
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
        assert_eq!(config.tasks.readme.model, "m");
        assert_eq!(
            config.tasks.readme.generate_timeout,
            Some(Duration::from_secs(90))
        );
        assert_eq!(config.tasks.architecture.model, DEFAULT_MODEL);
    }
}
