use std::{future::Future, sync::Arc};

use ollama_rs::{
    Ollama,
    generation::{
        completion::request::GenerationRequest,
        parameters::{KeepAlive, TimeUnit},
    },
};
use tokio::{sync::Semaphore, time};
use tracing::debug;

use super::{OllamaConfig, Summarizer, Task, utils};
use crate::error::{RepoDigestError, Result};

pub struct OllamaWrapper {
    client: Ollama,
    config: OllamaConfig,
    lock: Arc<Semaphore>,
}

impl OllamaWrapper {
    /// Fails with `InvalidConfig` when the host and port do not form a usable URL.
    pub fn with_config(config: OllamaConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        debug!(base_url = %base_url, "ollama_client_configured");
        Ok(Self {
            client: Ollama::new(config.host.trim().to_string(), config.port),
            lock: Arc::new(Semaphore::new(config.max_in_flight.max(1))),
            config,
        })
    }

    pub fn model_name(&self, task: Task) -> &str {
        &self.config.tasks.for_task(task).model
    }

    async fn request(&self, task: Task, prompt: String) -> std::result::Result<String, String> {
        let model_cfg = self.config.tasks.for_task(task);

        let _permit = match time::timeout(self.config.lock_timeout, self.lock.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(e)) => return Err(format!("failed to acquire lock: {e}")),
            Err(_) => {
                return Err(format!(
                    "timeout acquiring lock for model {}",
                    model_cfg.model
                ));
            }
        };

        debug!(
            task = task.as_str(),
            prompt_bytes = prompt.len(),
            model = %model_cfg.model,
            "ollama_request"
        );

        let request = GenerationRequest::new(model_cfg.model.clone(), prompt)
            .keep_alive(KeepAlive::Until {
                time: self.config.keep_alive_minutes,
                unit: TimeUnit::Minutes,
            })
            .options(model_cfg.options());

        if let Some(generate_timeout) = model_cfg.generate_timeout {
            return match time::timeout(generate_timeout, self.client.generate(request)).await {
                Ok(Ok(response)) => Ok(response.response),
                Ok(Err(err)) => Err(format!("ollama error ({}): {err}", model_cfg.model)),
                Err(_) => Err(format!(
                    "ollama error ({}): request timeout after {} seconds",
                    model_cfg.model,
                    generate_timeout.as_secs()
                )),
            };
        }

        self.client
            .generate(request)
            .await
            .map(|response| response.response)
            .map_err(|err| format!("ollama error ({}): {err}", model_cfg.model))
    }

    fn postprocess_output(&self, task: Task, out: String) -> std::result::Result<String, String> {
        let out = utils::strip_wrapping_code_fence(out);
        utils::ensure_non_empty(task, self.model_name(task), out)
    }
}

impl Summarizer for OllamaWrapper {
    fn generate(&self, task: Task, prompt: String) -> impl Future<Output = Result<String>> + Send {
        async move {
            let out = self
                .request(task, prompt)
                .await
                .map_err(RepoDigestError::Llm)?;
            self.postprocess_output(task, out)
                .map_err(RepoDigestError::Llm)
        }
    }
}
