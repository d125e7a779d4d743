// src/services/providers/gradio_space.rs
use super::{ImageInput, ProviderAdapter, error_message_from_body, http_client, transport_error};
use crate::config::GradioSettings;
use crate::errors::RedesignError;
use crate::models::{GenerationParams, ProviderOutput};
use crate::services::ImageProcessor;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use std::time::Duration;

/// Public community-hosted model space driven through its queue API.
///
/// The image goes up as a file upload, the prediction is started by name,
/// and the resulting file is fetched back and re-encoded as PNG.
pub struct GradioSpaceProvider {
    space_url: String,
    api_name: String,
    client: Client,
    image_processor: ImageProcessor,
}

impl GradioSpaceProvider {
    pub fn new(settings: &GradioSettings, timeout: Duration) -> Result<Self, RedesignError> {
        Ok(Self {
            space_url: settings.space_url.trim_end_matches('/').to_string(),
            api_name: settings.api_name.trim_start_matches('/').to_string(),
            client: http_client(timeout)?,
            image_processor: ImageProcessor::new(),
        })
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RedesignError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(RedesignError::ProviderApi {
            status: status.as_u16(),
            message: error_message_from_body(&body),
        })
    }

    async fn upload(&self, image: ImageInput<'_>) -> Result<String, RedesignError> {
        let (data, file_name) = match image.scratch_path {
            Some(path) => {
                let data = tokio::fs::read(path).await.map_err(|e| {
                    RedesignError::Internal(format!("Failed to read scratch file: {}", e))
                })?;
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                (data, file_name)
            }
            None => (image.data.to_vec(), "upload".to_string()),
        };

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(image.mime_type)
            .map_err(|e| RedesignError::Internal(format!("Invalid MIME type: {}", e)))?;

        let response = self
            .client
            .post(format!("{}/gradio_api/upload", self.space_url))
            .multipart(Form::new().part("files", part))
            .send()
            .await
            .map_err(|e| transport_error("Model space", e))?;
        let paths: Value = self
            .check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| {
                RedesignError::Provider(format!("Failed to parse upload response: {}", e))
            })?;

        paths
            .get(0)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                RedesignError::Provider(format!("Unexpected upload response: {}", paths))
            })
    }

    async fn start_prediction(&self, data: Value) -> Result<String, RedesignError> {
        let response = self
            .client
            .post(format!("{}/gradio_api/call/{}", self.space_url, self.api_name))
            .json(&json!({ "data": data }))
            .send()
            .await
            .map_err(|e| transport_error("Model space", e))?;
        let body: Value = self
            .check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RedesignError::Provider(format!("Failed to parse call response: {}", e)))?;

        body["event_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                RedesignError::Provider(format!("Missing event_id in response: {}", body))
            })
    }

    async fn await_result(&self, event_id: &str) -> Result<Value, RedesignError> {
        let response = self
            .client
            .get(format!(
                "{}/gradio_api/call/{}/{}",
                self.space_url, self.api_name, event_id
            ))
            .send()
            .await
            .map_err(|e| transport_error("Model space", e))?;
        let stream = self
            .check_status(response)
            .await?
            .text()
            .await
            .map_err(|e| transport_error("Model space", e))?;

        parse_event_stream(&stream)
    }

    fn result_url(&self, output: &Value) -> Result<String, RedesignError> {
        let file = match output {
            Value::Array(items) => items.first(),
            other => Some(other),
        };

        match file {
            Some(Value::Object(fields)) => {
                if let Some(url) = fields.get("url").and_then(Value::as_str) {
                    return Ok(self.absolute(url));
                }
                fields
                    .get("path")
                    .and_then(Value::as_str)
                    .map(|path| self.file_url(path))
                    .ok_or_else(|| {
                        RedesignError::Provider(format!("Result file has no location: {}", output))
                    })
            }
            Some(Value::String(path)) => Ok(self.file_url(path)),
            _ => Err(RedesignError::Provider(format!(
                "Unexpected prediction output: {}",
                output
            ))),
        }
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.space_url, url)
        } else {
            url.to_string()
        }
    }

    fn file_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/gradio_api/file={}", self.space_url, path)
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, RedesignError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error("Model space", e))?;
        let bytes = self
            .check_status(response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error("Model space", e))?;
        Ok(bytes.to_vec())
    }
}

/// Returns the payload of the `complete` event. An `error` event, or a stream
/// that ends without either, is a provider failure.
fn parse_event_stream(stream: &str) -> Result<Value, RedesignError> {
    let mut event = "";
    for line in stream.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
        } else if let Some(data) = line.strip_prefix("data:") {
            let data = data.trim();
            match event {
                "complete" => {
                    return serde_json::from_str(data).map_err(|e| {
                        RedesignError::Provider(format!("Failed to parse prediction result: {}", e))
                    });
                }
                "error" => {
                    let message = match serde_json::from_str::<Value>(data) {
                        Ok(Value::String(message)) => message,
                        Ok(Value::Null) | Err(_) if data.is_empty() || data == "null" => {
                            "model space reported an error".to_string()
                        }
                        _ => data.to_string(),
                    };
                    return Err(RedesignError::Provider(message));
                }
                _ => {}
            }
        }
    }

    Err(RedesignError::Provider(
        "Prediction stream ended without a result".to_string(),
    ))
}

#[async_trait]
impl ProviderAdapter for GradioSpaceProvider {
    fn name(&self) -> &str {
        "gradio"
    }

    fn default_params(&self) -> GenerationParams {
        GenerationParams {
            guidance_scale: 7.5,
            num_inference_steps: 20,
            negative_prompt: None,
            seed: Some(42),
        }
    }

    fn needs_scratch_file(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        image: ImageInput<'_>,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<ProviderOutput, RedesignError> {
        let server_path = self.upload(image).await?;
        debug!("Uploaded source image to {}", server_path);

        let event_id = self
            .start_prediction(json!([
                { "path": server_path, "meta": { "_type": "gradio.FileData" } },
                prompt,
                params.guidance_scale,
                params.num_inference_steps,
                params.seed.unwrap_or(42),
            ]))
            .await?;
        debug!("Prediction queued as {}", event_id);

        let output = self.await_result(&event_id).await?;
        let url = self.result_url(&output)?;
        let raw = self.download(&url).await?;

        let data = self.image_processor.reencode_png(&raw).map_err(|e| {
            RedesignError::Provider(format!("Model space returned an unreadable image: {}", e))
        })?;

        Ok(ProviderOutput::InlineImage {
            data,
            mime_type: "image/png".to_string(),
        })
    }
}
