use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

use crate::moderation::SUPPORTED_IMAGE_TYPES;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    supported: Option<Vec<&'static str>>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Uploaded file is not a valid image or is corrupted.")]
    InvalidImage,

    #[error("{0}")]
    LlmError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            // Undecodable uploads share the upstream status, not 422.
            AppError::InvalidImage => StatusCode::SERVICE_UNAVAILABLE,
            AppError::LlmError(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let supported = match &self {
            AppError::UnsupportedMediaType(_) => Some(SUPPORTED_IMAGE_TYPES.to_vec()),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            supported,
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::LlmError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (AppError::UnsupportedMediaType("text/plain".into()), StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (AppError::InvalidImage, StatusCode::SERVICE_UNAVAILABLE),
            (AppError::LlmError("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::ConfigError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn unsupported_media_message() {
        let err = AppError::UnsupportedMediaType("text/plain".into());
        assert_eq!(err.to_string(), "Unsupported media type: text/plain");
    }

    #[test]
    fn unsupported_media_body_lists_types() {
        let body = ErrorResponse {
            error: "Unsupported media type: text/plain".into(),
            supported: Some(SUPPORTED_IMAGE_TYPES.to_vec()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json["supported"],
            serde_json::json!(["image/gif", "image/jpeg", "image/png", "image/webp"])
        );
    }

    #[test]
    fn plain_errors_omit_supported() {
        let body = ErrorResponse { error: "nope".into(), supported: None };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "nope" }));
    }
}
