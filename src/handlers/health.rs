//! # Health Check Handler
//!
//! Liveness for load balancers and monitoring. Touches neither the session
//! nor the credential store, so it stays green while the backend is down.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /health`
///
/// ```json
/// { "status": "healthy", "service": "stateless-passkey", "version": "0.1.0", "rpId": "localhost" }
/// ```
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "rpId": state.rp.id,
    }))
}
