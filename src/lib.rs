//! # Stateless Passkey Server
//!
//! Passwordless WebAuthn registration and login with no server-side
//! session or challenge storage. Ceremony state travels in one encrypted
//! cookie; the server persists only public keys and signature counters.
//!
//! ## Modules
//! - `codec`: binary fields ⇄ base64 JSON, declared per message type
//! - `db`: credential records and session key material
//! - `session`: the AES-GCM sealed `SESSION` cookie
//! - `webauthn`: ceremonies and their verification
//! - `handlers`, `middleware`, `routes`: the HTTP surface

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod webauthn;

pub use routes::create_router;
pub use state::AppState;
