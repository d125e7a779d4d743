// src/config.rs
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_REPLICATE_MODEL: &str =
    "adirik/interior-design:76604baddc85b1b4616e1c6475eca080da339c8875bd4996705440484a6eac38";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which remote backend serves `/redesign`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Replicate,
    HfInference,
    GradioSpace,
    GradioSpaceHardened,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Replicate => "replicate",
            ProviderKind::HfInference => "hf-inference",
            ProviderKind::GradioSpace => "gradio",
            ProviderKind::GradioSpaceHardened => "gradio-hardened",
        }
    }

    /// The hardened space preprocesses whatever `PREPROCESS_IMAGES` says.
    fn always_preprocesses(&self) -> bool {
        matches!(self, ProviderKind::GradioSpaceHardened)
    }

    fn retries_by_default(&self) -> bool {
        matches!(self, ProviderKind::GradioSpaceHardened)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replicate" => Ok(ProviderKind::Replicate),
            "hf-inference" | "huggingface" => Ok(ProviderKind::HfInference),
            "gradio" => Ok(ProviderKind::GradioSpace),
            "gradio-hardened" => Ok(ProviderKind::GradioSpaceHardened),
            other => Err(format!(
                "unknown provider '{}' (expected replicate, hf-inference, gradio, gradio-hardened)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicateSettings {
    pub api_base: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HfInferenceSettings {
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradioSettings {
    pub space_url: String,
    pub api_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub provider: ProviderKind,
    pub request_timeout: Duration,
    pub max_image_dimension: u32,
    pub preprocess: bool,
    pub retry_enabled: bool,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub max_upload_bytes: usize,
    pub static_dir: PathBuf,
    pub replicate: ReplicateSettings,
    pub hf_inference: HfInferenceSettings,
    pub gradio: GradioSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let provider: ProviderKind =
            parse_or(&get, "REDESIGN_PROVIDER", ProviderKind::GradioSpaceHardened)?;
        let preprocess_requested = get("PREPROCESS_IMAGES")
            .map(|value| parse_bool("PREPROCESS_IMAGES", &value))
            .transpose()?
            .unwrap_or(false);
        let preprocess = provider.always_preprocesses() || preprocess_requested;

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 5000)?,
            provider,
            request_timeout: Duration::from_secs(parse_or(&get, "PROVIDER_TIMEOUT_SECS", 120)?),
            max_image_dimension: parse_or(&get, "MAX_IMAGE_DIMENSION", 512)?,
            preprocess,
            retry_enabled: provider.retries_by_default(),
            retry_attempts: parse_or(&get, "RETRY_ATTEMPTS", 2)?,
            retry_delay: Duration::from_secs(parse_or(&get, "RETRY_DELAY_SECS", 2)?),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", 16 * 1024 * 1024)?,
            static_dir: PathBuf::from(get("STATIC_DIR").unwrap_or_else(|| "static".to_string())),
            replicate: ReplicateSettings {
                api_base: get("REPLICATE_API_BASE")
                    .map(|value| value.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| "https://api.replicate.com/v1".to_string()),
                model: get("REPLICATE_MODEL")
                    .unwrap_or_else(|| DEFAULT_REPLICATE_MODEL.to_string()),
            },
            hf_inference: HfInferenceSettings {
                endpoint: get("HF_INFERENCE_URL").unwrap_or_else(|| {
                    "https://api-inference.huggingface.co/models/timbrooks/instruct-pix2pix"
                        .to_string()
                }),
            },
            gradio: GradioSettings {
                space_url: get("GRADIO_SPACE_URL")
                    .map(|value| value.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| "https://timbrooks-instruct-pix2pix.hf.space".to_string()),
                api_name: get("GRADIO_API_NAME")
                    .map(|value| value.trim_start_matches('/').to_string())
                    .unwrap_or_else(|| "generate".to_string()),
            },
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.bind_addr.clone(), self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_select_the_hardened_space() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.provider, ProviderKind::GradioSpaceHardened);
        assert!(config.preprocess);
        assert!(config.retry_enabled);
        assert_eq!(config.retry_attempts, 2);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.max_image_dimension, 512);
        assert_eq!(config.port, 5000);
        assert_eq!(config.replicate.model, DEFAULT_REPLICATE_MODEL);
    }

    #[test]
    fn plain_variants_skip_preprocessing_and_retry() {
        for name in ["replicate", "hf-inference", "gradio"] {
            let config = config_from(&[("REDESIGN_PROVIDER", name)]).unwrap();
            assert!(!config.preprocess, "{name} should forward raw bytes");
            assert!(!config.retry_enabled, "{name} should not retry");
        }
    }

    #[test]
    fn preprocess_can_be_overridden() {
        let config =
            config_from(&[("REDESIGN_PROVIDER", "replicate"), ("PREPROCESS_IMAGES", "yes")])
                .unwrap();
        assert!(config.preprocess);
    }

    #[test]
    fn hardened_space_always_preprocesses() {
        let config = config_from(&[("PREPROCESS_IMAGES", "false")]).unwrap();
        assert_eq!(config.provider, ProviderKind::GradioSpaceHardened);
        assert!(config.preprocess);

        let config =
            config_from(&[("REDESIGN_PROVIDER", "gradio"), ("PREPROCESS_IMAGES", "false")])
                .unwrap();
        assert!(!config.preprocess);
    }

    #[test]
    fn urls_are_normalized() {
        let config = config_from(&[
            ("GRADIO_SPACE_URL", "http://localhost:7860/"),
            ("GRADIO_API_NAME", "/predict"),
            ("REPLICATE_API_BASE", "http://localhost:9000/v1/"),
        ])
        .unwrap();
        assert_eq!(config.gradio.space_url, "http://localhost:7860");
        assert_eq!(config.gradio.api_name, "predict");
        assert_eq!(config.replicate.api_base, "http://localhost:9000/v1");
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = config_from(&[("REDESIGN_PROVIDER", "dalle")]).unwrap_err();
        assert!(err.to_string().contains("REDESIGN_PROVIDER"));

        let err = config_from(&[("PREPROCESS_IMAGES", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("PREPROCESS_IMAGES"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config_from(&[("PORT", "  "), ("BIND_ADDR", "")]).unwrap();
        assert_eq!(config.bind_address(), ("0.0.0.0".to_string(), 5000));
    }
}
