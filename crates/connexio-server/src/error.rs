use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use connexio_store::StoreError;
use thiserror::Error;

use crate::api::ErrorResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Classify an extractor rejection by the status axum assigned it.
    pub fn rejected(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(message)
        } else {
            Self::Validation(message)
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::FileNotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
