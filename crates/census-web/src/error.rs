//! Error types for the census web layer.
//!
//! [`WebError`] unifies all failure modes of a request into a single enum
//! that converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::store::StoreError;

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A page template failed to render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The census store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Serialization(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {e}"))
            }
            Self::Template(e) => {
                tracing::error!(error = %e, "template render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, String::from("page could not be rendered"))
            }
            Self::Store(e) => match e {
                StoreError::UnknownPlace(_)
                | StoreError::UnknownDataset(_)
                | StoreError::UnknownSubmission(_) => (StatusCode::NOT_FOUND, e.to_string()),
                StoreError::AlreadyReviewed(_) => (StatusCode::CONFLICT, e.to_string()),
                StoreError::Io { .. } | StoreError::Parse { .. } | StoreError::NoDataPath => {
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
            },
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
