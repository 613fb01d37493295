//! # Middleware Module
//!
//! Middleware runs before the route handlers and can short-circuit the
//! request.
//!
//! ## Our Middleware
//! - `auth`: Checks that the session cookie marks the user as logged in

pub mod auth;
