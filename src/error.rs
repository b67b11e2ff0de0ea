use axum::extract::multipart::MultipartError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum RakError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    InvalidForm(String),

    #[error("File size should be less than {limit_mb}MB")]
    PayloadTooLarge { limit_mb: usize },

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Can't mint")]
    MissingCid,

    #[error("This credential is already minted by {owner}")]
    AlreadyMinted { owner: String },

    #[error("can't create record")]
    RecordNotCreated,

    #[error("Certificate not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Object storage error: {0}")]
    ObjectStorage(String),

    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),
}

impl RakError {
    /// Fold an oversized multipart stream into the size-limit answer.
    pub fn from_multipart(err: MultipartError, limit_mb: usize) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            RakError::PayloadTooLarge { limit_mb }
        } else {
            RakError::Multipart(err)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RakError::Unauthorized
            | RakError::InvalidForm(_)
            | RakError::MissingCid
            | RakError::AlreadyMinted { .. } => StatusCode::BAD_REQUEST,
            RakError::Multipart(e) => e.status(),
            RakError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RakError::NotFound => StatusCode::NOT_FOUND,
            RakError::RecordNotCreated
            | RakError::DatabaseError(_)
            | RakError::ObjectStorage(_)
            | RakError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RakError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            RakError::DatabaseError(_) | RakError::Template(_) => {
                error!(error = %self, "request failed");
                "An internal server error occurred.".to_string()
            }
            RakError::ObjectStorage(_) => {
                error!(error = %self, "request failed");
                "Object storage request failed.".to_string()
            }
            RakError::Multipart(e) => e.body_text(),
            other => other.to_string(),
        };
        (status, Json(MessageBody { message, cid: None })).into_response()
    }
}

/// JSON body shared by every `/api/mint` answer.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
}
