//! # Router
//!
//! | Route                    | Handler |
//! |--------------------------|---------|
//! | `GET /`                  | session summary + options for both ceremonies |
//! | `POST /register/options` | registration options for a username |
//! | `POST /register`         | finish registration |
//! | `POST /authenticate`     | finish authentication |
//! | `GET /logout`            | drop the session cookie |
//! | `GET /health`            | liveness |
//! | `GET /api/users/me`      | current user (requires login) |

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::auth::{authenticate, index, logout, register, register_options};
use crate::handlers::health::health_check;
use crate::handlers::users::get_current_user;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/users/me", get(get_current_user))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/register/options", post(register_options))
        .route("/register", post(register))
        .route("/authenticate", post(authenticate))
        .route("/logout", get(logout))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
