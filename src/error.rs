use crate::fcm_sender::FcmError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("Server not configured: {0}")]
    Configuration(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Failed to obtain access token: {status} {body}")]
    Exchange { status: u16, body: String },

    #[error("Failed to fetch device tokens from tenant: {status} {body}")]
    TenantFetch { status: u16, body: String },

    #[error("{0}")]
    Fcm(#[from] FcmError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Configuration(_)
            | ServiceError::Credential(_)
            | ServiceError::Exchange { .. }
            | ServiceError::TenantFetch { .. }
            | ServiceError::Fcm(_)
            | ServiceError::Http(_)
            | ServiceError::Config(_)
            | ServiceError::SerdeJson(_)
            | ServiceError::Io(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
