//! Failure modes of the catalog endpoints and their HTTP rendering.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use catalog_core::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    /// No record with the requested id.
    #[error("not found")]
    NotFound,

    /// The request body is not valid JSON.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// The store rejected or failed the call.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::NotFound => (
                status,
                Json(json!({ "code": status.as_u16(), "error": "Not found" })),
            )
                .into_response(),
            Self::InvalidBody(e) => {
                warn!(error = %e, "Rejected request body");
                status.into_response()
            }
            // Store details stay in the server log
            Self::Store(e) => {
                error!(error = %e, "Store operation failed");
                status.into_response()
            }
        }
    }
}
