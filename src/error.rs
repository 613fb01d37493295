//! # Error Handling
//!
//! Every layer has its own `thiserror` enum (`CodecError`, `StoreError`,
//! `SessionError`, `VerificationError`). They are folded into [`AppError`]
//! here and turned into HTTP responses.
//!
//! ## Information hiding
//! A rejected ceremony answers with one fixed body, whatever the cause:
//! unknown user, bad signature, wrong origin, replayed counter and
//! malformed payload all look alike to the client. The cause is logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::codec::CodecError;
use crate::db::StoreError;
use crate::session::SessionError;
use crate::webauthn::verifier::VerificationError;

/// Body of every rejected ceremony
pub const REJECTED: &str = "Verification failed";

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// A payload did not fit its message schema
    #[error("Marshal type mismatch: {0}")]
    MarshalTypeMismatch(#[from] CodecError),

    /// Cryptographic or protocol failure, including replay
    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    /// No credential registered for the presented user handle
    #[error("Unknown user")]
    UnknownUser,

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Malformed request outside the ceremony payloads
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No authenticated session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::MarshalTypeMismatch(e) => {
                // Contract violation between client and server code
                tracing::error!("Marshal type mismatch: {}", e);
                (StatusCode::BAD_REQUEST, REJECTED.to_string())
            }
            AppError::Verification(e) => {
                tracing::warn!("Verification rejected: {}", e);
                (StatusCode::BAD_REQUEST, REJECTED.to_string())
            }
            AppError::UnknownUser => {
                tracing::warn!("Verification rejected: unknown user");
                (StatusCode::BAD_REQUEST, REJECTED.to_string())
            }
            AppError::BadRequest(reason) => {
                tracing::warn!("Bad request: {}", reason);
                (StatusCode::BAD_REQUEST, REJECTED.to_string())
            }
            AppError::Store(e) => {
                tracing::error!("Credential store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            AppError::Session(e) => {
                tracing::error!("Session error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Session error".to_string())
            }
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
