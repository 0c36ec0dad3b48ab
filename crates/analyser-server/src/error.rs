//! Error types for the trigger surface

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use s3_analyser::AnalyserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid token")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Analysis(#[from] AnalyserError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Analysis(AnalyserError::InvalidFilter { .. }) => StatusCode::BAD_REQUEST,
            ServerError::Analysis(AnalyserError::RunAlreadyInProgress) => StatusCode::CONFLICT,
            ServerError::Analysis(_) | ServerError::Config(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Analysis request failed: {}", self);
        } else {
            tracing::warn!("Rejected request: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
