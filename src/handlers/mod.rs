//! # HTTP Request Handlers
//!
//! ## Submodules
//! - `health`: Health check endpoint (for monitoring)
//! - `auth`: Ceremony endpoints (options, register, authenticate, logout)
//! - `users`: Current user summary
//!
//! ## Handler Pattern
//! Handlers are async functions that:
//! 1. Extract the state, the [`SessionState`](crate::session::SessionState)
//!    and the JSON body
//! 2. Call into `webauthn`
//! 3. Return the response with the re-sealed session cookie

pub mod auth;
pub mod health;
pub mod users;
