use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::AppError;
use crate::session::SessionState;
use crate::webauthn::ceremony::USER_HANDLE_KEY;

/// Reject requests whose session cookie does not carry a verified user handle.
pub async fn require_auth(
    session: SessionState,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match session.get_string(USER_HANDLE_KEY) {
        Some(_) => Ok(next.run(request).await),
        None => Err(AppError::Unauthorized("Not authenticated".to_string())),
    }
}
