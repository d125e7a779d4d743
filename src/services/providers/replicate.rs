// src/services/providers/replicate.rs
use super::{
    Credential, ImageInput, ProviderAdapter, error_message_from_body, http_client, transport_error,
};
use crate::config::ReplicateSettings;
use crate::errors::RedesignError;
use crate::models::{GenerationParams, ProviderOutput, data_uri};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

const NEGATIVE_PROMPT: &str = "lowres, watermark, banner, logo, text, blurry, ugly, distorted";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ModelRef {
    Version(String),
    Model { owner: String, name: String },
}

impl ModelRef {
    fn parse(reference: &str) -> Result<Self, RedesignError> {
        let reference = reference.trim();
        if let Some((_, version)) = reference.split_once(':') {
            if !version.is_empty() {
                return Ok(ModelRef::Version(version.to_string()));
            }
        }
        match reference.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok(ModelRef::Model {
                owner: owner.to_string(),
                name: name.trim_end_matches(':').to_string(),
            }),
            _ => Err(RedesignError::Configuration(format!(
                "Invalid Replicate model reference: {}",
                reference
            ))),
        }
    }
}

/// Runs a hosted model by reference and returns the URL it produced.
pub struct ReplicateProvider {
    api_base: String,
    model: ModelRef,
    credential: Credential,
    timeout: Duration,
    poll_interval: Duration,
    client: Client,
}

impl ReplicateProvider {
    pub fn new(
        settings: &ReplicateSettings,
        credential: Credential,
        timeout: Duration,
    ) -> Result<Self, RedesignError> {
        Ok(Self {
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            model: ModelRef::parse(&settings.model)?,
            credential,
            timeout,
            poll_interval: Duration::from_secs(1),
            client: http_client(timeout)?,
        })
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn prediction_request(&self, input: Value) -> (String, Value) {
        match &self.model {
            ModelRef::Version(version) => (
                format!("{}/predictions", self.api_base),
                json!({ "version": version, "input": input }),
            ),
            ModelRef::Model { owner, name } => (
                format!("{}/models/{}/{}/predictions", self.api_base, owner, name),
                json!({ "input": input }),
            ),
        }
    }

    async fn read_prediction(&self, response: reqwest::Response) -> Result<Value, RedesignError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RedesignError::ProviderApi {
                status: status.as_u16(),
                message: error_message_from_body(&body),
            });
        }

        response.json().await.map_err(|e| {
            RedesignError::Provider(format!("Failed to parse Replicate response: {}", e))
        })
    }

    async fn wait_for_completion(
        &self,
        mut prediction: Value,
        token: &str,
        started: Instant,
    ) -> Result<Value, RedesignError> {
        loop {
            let status = prediction["status"].as_str().unwrap_or_default().to_string();
            match status.as_str() {
                "succeeded" => return Ok(prediction),
                "failed" | "canceled" => {
                    let reason = match &prediction["error"] {
                        Value::String(message) => message.clone(),
                        Value::Null => format!("prediction {}", status),
                        other => other.to_string(),
                    };
                    return Err(RedesignError::Provider(format!(
                        "Replicate prediction failed: {}",
                        reason
                    )));
                }
                "starting" | "processing" => {}
                other => {
                    return Err(RedesignError::Provider(format!(
                        "Unexpected Replicate prediction status: {:?}",
                        other
                    )));
                }
            }

            if started.elapsed() >= self.timeout {
                return Err(RedesignError::ProviderTimeout);
            }

            let poll_url = prediction["urls"]["get"]
                .as_str()
                .filter(|url| !url.trim().is_empty())
                .ok_or_else(|| {
                    RedesignError::Provider("Replicate prediction missing poll URL".to_string())
                })?
                .to_string();

            tokio::time::sleep(self.poll_interval).await;
            debug!("Polling Replicate prediction at {}", poll_url);

            let response = self
                .client
                .get(&poll_url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| transport_error("Replicate", e))?;
            prediction = self.read_prediction(response).await?;
        }
    }
}

fn first_output_url(output: &Value) -> Result<String, RedesignError> {
    let candidate = match output {
        Value::String(url) => Some(url.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    };

    candidate
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            RedesignError::Provider(format!("Unexpected Replicate output shape: {}", output))
        })
}

#[async_trait]
impl ProviderAdapter for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    fn default_params(&self) -> GenerationParams {
        GenerationParams {
            guidance_scale: 15.0,
            num_inference_steps: 50,
            negative_prompt: Some(NEGATIVE_PROMPT.to_string()),
            seed: None,
        }
    }

    fn check_configuration(&self) -> Result<(), RedesignError> {
        self.credential.resolve().map(|_| ())
    }

    async fn generate(
        &self,
        image: ImageInput<'_>,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderOutput, RedesignError> {
        let token = self.credential.resolve()?;
        let started = Instant::now();

        let mut input = json!({
            "image": data_uri(image.mime_type, image.data),
            "prompt": prompt,
            "guidance_scale": params.guidance_scale,
            "num_inference_steps": params.num_inference_steps,
        });
        if let Some(negative_prompt) = &params.negative_prompt {
            input["negative_prompt"] = json!(negative_prompt);
        }
        if let Some(seed) = params.seed {
            input["seed"] = json!(seed);
        }

        let (endpoint, body) = self.prediction_request(input);
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("Replicate", e))?;

        let prediction = self.read_prediction(response).await?;
        let prediction = self.wait_for_completion(prediction, &token, started).await?;

        let url = first_output_url(&prediction["output"])?;
        debug!("Replicate returned {}", url);
        Ok(ProviderOutput::Url(url))
    }
}
