// src/services/providers/mod.rs
pub mod gradio_space;
pub mod hf_inference;
pub mod replicate;

pub use gradio_space::GradioSpaceProvider;
pub use hf_inference::HfInferenceProvider;
pub use replicate::ReplicateProvider;

use crate::config::{AppConfig, ProviderKind};
use crate::errors::RedesignError;
use crate::models::{GenerationParams, ProviderOutput};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// The image handed to a provider, plus an on-disk copy when the provider
/// asked for one.
#[derive(Debug, Clone, Copy)]
pub struct ImageInput<'a> {
    pub data: &'a [u8],
    pub mime_type: &'a str,
    pub scratch_path: Option<&'a Path>,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn default_params(&self) -> GenerationParams;

    /// Checked before any network traffic.
    fn check_configuration(&self) -> Result<(), RedesignError> {
        Ok(())
    }

    fn needs_scratch_file(&self) -> bool {
        false
    }

    async fn generate(
        &self,
        image: ImageInput<'_>,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderOutput, RedesignError>;
}

/// API token looked up by environment variable name on every request.
#[derive(Debug, Clone)]
pub struct Credential {
    name: String,
    fixed: Option<String>,
}

impl Credential {
    pub fn from_env(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed: None,
        }
    }

    #[cfg(test)]
    pub fn fixed(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixed: Some(value.into()),
        }
    }

    pub fn resolve(&self) -> Result<String, RedesignError> {
        self.fixed
            .clone()
            .or_else(|| std::env::var(&self.name).ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| RedesignError::Configuration(format!("{} not set", self.name)))
    }
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, RedesignError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RedesignError::Internal(format!("Failed to build HTTP client: {}", e)))
}

pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> RedesignError {
    if err.is_timeout() {
        RedesignError::ProviderTimeout
    } else {
        RedesignError::Provider(format!("{} request failed: {}", provider, err))
    }
}

/// Pulls a human-readable message out of an error body, preferring `error`
/// or `detail` fields when the body is JSON.
pub(crate) fn error_message_from_body(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let from_json = parsed.as_ref().and_then(|value| {
        ["error", "detail", "message"]
            .iter()
            .find_map(|key| match value.get(*key)? {
                serde_json::Value::String(text) => Some(text.clone()),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
    });

    from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            truncate(trimmed, 500)
        }
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

pub fn build_provider(config: &AppConfig) -> Result<Arc<dyn ProviderAdapter>, RedesignError> {
    let provider: Arc<dyn ProviderAdapter> = match config.provider {
        ProviderKind::Replicate => Arc::new(ReplicateProvider::new(
            &config.replicate,
            Credential::from_env("REPLICATE_API_TOKEN"),
            config.request_timeout,
        )?),
        ProviderKind::HfInference => Arc::new(HfInferenceProvider::new(
            &config.hf_inference,
            Credential::from_env("HF_API_TOKEN"),
            config.request_timeout,
        )?),
        ProviderKind::GradioSpace | ProviderKind::GradioSpaceHardened => Arc::new(
            GradioSpaceProvider::new(&config.gradio, config.request_timeout)?,
        ),
    };
    Ok(provider)
}
