use crate::api::models::solve::SolveResponse;
use crate::ocr::OcrError;
use crate::storage::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The multipart body has no "image" field
    #[error("No image uploaded.")]
    MissingFile,

    /// The declared content type of the upload is not image/*
    #[error("File is not an image.")]
    NotAnImage { content_type: String },

    /// The stored upload could not be decoded as an image
    #[error("Uploaded file is not a valid image.")]
    InvalidImage(#[source] image::ImageError),

    /// The OCR engine failed on a decoded image
    #[error("OCR failed: {0}")]
    OcrFailure(#[from] OcrError),

    /// Malformed multipart payload
    #[error("{message}")]
    BadRequest { message: String },

    /// Blob store operation error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MissingFile | Error::NotAnImage { .. } | Error::InvalidImage(_) | Error::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::OcrFailure(_) | Error::Storage(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Storage(_) | Error::Other(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Storage(_) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::OcrFailure(_) => {
                tracing::error!("OCR engine error: {}", self);
            }
            Error::NotAnImage { content_type } => {
                tracing::debug!(content_type = %content_type, "Client error: {}", self);
            }
            Error::MissingFile | Error::InvalidImage(_) | Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        (status, Json(SolveResponse::failure(self.user_message()))).into_response()
    }
}

/// Type alias for handler results
pub type Result<T> = std::result::Result<T, Error>;
