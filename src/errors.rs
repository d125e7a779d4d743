// src/errors.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RedesignError {
    #[error("No image uploaded")]
    MissingImage,

    #[error("Unknown style: {0}")]
    UnknownStyle(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("Image exceeds {0} bytes")]
    UploadTooLarge(usize),

    #[error("Invalid upload: {0}")]
    Multipart(String),

    #[error("{0}")]
    Configuration(String),

    #[error("API error ({status}): {message}")]
    ProviderApi { status: u16, message: String },

    #[error("Request timed out. The model may be busy, please try again.")]
    ProviderTimeout,

    #[error("{0}")]
    Provider(String),

    #[error("AI model error: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RedesignError {
    /// Caller mistakes, as opposed to operator or upstream failures.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RedesignError::MissingImage
                | RedesignError::UnknownStyle(_)
                | RedesignError::UnsupportedImageFormat(_)
                | RedesignError::UploadTooLarge(_)
                | RedesignError::Multipart(_)
        )
    }

    /// Failures that came back from (or on the way to) the remote provider.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RedesignError::ProviderApi { .. }
                | RedesignError::ProviderTimeout
                | RedesignError::Provider(_)
        )
    }
}

impl ResponseError for RedesignError {
    fn status_code(&self) -> StatusCode {
        match self {
            RedesignError::MissingImage
            | RedesignError::UnknownStyle(_)
            | RedesignError::UnsupportedImageFormat(_)
            | RedesignError::Multipart(_) => StatusCode::BAD_REQUEST,
            RedesignError::UploadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RedesignError::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
            RedesignError::Configuration(_)
            | RedesignError::ProviderApi { .. }
            | RedesignError::Provider(_)
            | RedesignError::RetriesExhausted { .. }
            | RedesignError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

impl From<actix_multipart::MultipartError> for RedesignError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        RedesignError::Multipart(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_map_to_bad_request() {
        assert_eq!(
            RedesignError::MissingImage.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RedesignError::UnknownStyle("atlantis".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert!(RedesignError::UnknownStyle("atlantis".into()).is_input_error());
    }

    #[test]
    fn provider_failures_render_expected_messages() {
        let api = RedesignError::ProviderApi {
            status: 503,
            message: "Model is loading".into(),
        };
        assert_eq!(api.to_string(), "API error (503): Model is loading");
        assert_eq!(api.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let exhausted = RedesignError::RetriesExhausted {
            attempts: 2,
            message: "queue full".into(),
        };
        assert_eq!(exhausted.to_string(), "AI model error: queue full");
        assert!(!exhausted.is_retryable());

        assert_eq!(
            RedesignError::ProviderTimeout.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert!(
            RedesignError::ProviderTimeout
                .to_string()
                .starts_with("Request timed out")
        );
    }

    #[test]
    fn configuration_error_is_server_side() {
        let err = RedesignError::Configuration("HF_API_TOKEN not set".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "HF_API_TOKEN not set");
        assert!(!err.is_input_error());
        assert!(!err.is_retryable());
    }
}
