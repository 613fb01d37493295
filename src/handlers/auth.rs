//! # Ceremony Handlers
//!
//! Thin HTTP wrappers around [`registration`] and [`authentication`].
//! Every handler that changes the session answers with a fresh `SESSION`
//! cookie; a rejected ceremony answers 400 and leaves the cookie as it was.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::session::{removal_cookie, SessionError, SessionState};
use crate::state::AppState;
use crate::webauthn::ceremony::USER_HANDLE_KEY;
use crate::webauthn::types::{RegistrationOptionsRequest, RegistrationRequest};
use crate::webauthn::{authentication, registration};

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// `GET /`: session summary plus fresh options for both ceremonies
pub async fn index(State(state): State<AppState>, mut session: SessionState) -> AppResult<Response> {
    let user_handle = session.get_string(USER_HANDLE_KEY).map(str::to_string);
    let counter = match &user_handle {
        Some(handle) => Some(state.store.find(handle).await?.counter),
        None => None,
    };

    let registration_options = registration::start_registration(&state, &mut session, None)?;
    let authentication_options = authentication::start_authentication(&state, &mut session)?;

    let body = json!({
        "authenticated": user_handle.is_some(),
        "userHandle": user_handle,
        "counter": counter,
        "registrationOptions": registration_options,
        "authenticationOptions": authentication_options,
    });
    Ok(session.to_response(Json(body))?)
}

/// `POST /register/options`: registration options bound to a username
pub async fn register_options(
    State(state): State<AppState>,
    mut session: SessionState,
    body: Result<Json<RegistrationOptionsRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request = json_body(body)?;
    let username = request.username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("empty username".to_string()));
    }
    let display_name = request
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(username);

    let options =
        registration::start_registration(&state, &mut session, Some((username, display_name)))?;
    Ok(session.to_response(Json(options))?)
}

/// `POST /register`: 204 on success, 400 otherwise
pub async fn register(
    State(state): State<AppState>,
    mut session: SessionState,
    body: Result<Json<RegistrationRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request = json_body(body)?;
    registration::finish_registration(&state, &mut session, request).await?;
    Ok(session.to_response(StatusCode::NO_CONTENT)?)
}

/// `POST /authenticate`: 204 on success, 400 otherwise
pub async fn authenticate(
    State(state): State<AppState>,
    mut session: SessionState,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    let wire = json_body(body)?;
    authentication::finish_authentication(&state, &mut session, &wire).await?;
    Ok(session.to_response(StatusCode::NO_CONTENT)?)
}

/// `GET /logout`: drop the cookie and go back to `/`
pub async fn logout(session: SessionState) -> AppResult<Response> {
    let cookie = removal_cookie(session.context());
    let mut response = (StatusCode::FOUND, [(LOCATION, "/")]).into_response();
    response.headers_mut().append(
        SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string()).map_err(SessionError::from)?,
    );
    tracing::debug!("Session cleared");
    Ok(response)
}
