use axum::http::StatusCode;
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("no signed-in user")]
    Auth,

    #[error("failed to load {what}: {source}")]
    RemoteRead {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("failed to save {what}: {source}")]
    RemoteWrite {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("background write did not complete: {0}")]
    WriteAborted(#[from] tokio::task::JoinError),
}

impl TrackerError {
    pub fn read(what: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::RemoteRead { what, source }
    }

    pub fn write(what: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::RemoteWrite { what, source }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        let status = match &err {
            TrackerError::Auth => StatusCode::UNAUTHORIZED,
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::RemoteRead { .. } => StatusCode::SERVICE_UNAVAILABLE,
            TrackerError::RemoteWrite { .. } => StatusCode::BAD_GATEWAY,
            TrackerError::WriteAborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {err}");
        } else {
            warn!("request rejected: {err}");
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
