//! # User Handlers

use axum::{extract::State, response::Response, Json};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::session::SessionState;
use crate::state::AppState;
use crate::webauthn::ceremony::USER_HANDLE_KEY;

/// Get the current user's credential summary
///
/// ## Route
/// GET /api/users/me
///
/// ## Authentication
/// Protected by the `require_auth` middleware
///
/// ## Response
/// ```json
/// { "userHandle": "base64...", "counter": 3 }
/// ```
///
/// The session cookie is re-sealed on the way out, so an active user keeps
/// sliding the two-minute expiry forward.
pub async fn get_current_user(
    State(state): State<AppState>,
    session: SessionState,
) -> AppResult<Response> {
    let user_handle = session
        .get_string(USER_HANDLE_KEY)
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;

    let record = state.store.find(user_handle).await?;

    // Public key deliberately left out
    let body = Json(json!({
        "userHandle": record.user_handle,
        "counter": record.counter,
    }));
    Ok(session.to_response(body)?)
}
