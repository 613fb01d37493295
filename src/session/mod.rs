//! # Encrypted Session Cookie
//!
//! The server keeps no session storage. Whatever a ceremony needs to
//! remember between two requests (the issued challenge, the pending user
//! handle, the logged-in user) travels in one AES-GCM sealed cookie that
//! only this server can read or forge.
//!
//! ## Lifecycle
//! 1. The [`SessionState`] extractor opens the inbound `SESSION` cookie
//! 2. Handlers read and write string, bytes or JSON entries
//! 3. [`SessionState::to_response`] seals the map again and sets the cookie
//!
//! Anything that goes wrong while opening the cookie (missing, expired,
//! tampered, sealed under another key, not a JSON object) yields an empty
//! session. Decoding never fails a request.

mod cipher;
mod context;

pub use cipher::{SessionCipher, NONCE_LEN};
pub use context::RequestContext;

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::{InvalidHeaderValue, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Map, Value};

use crate::codec;
use crate::state::AppState;

/// Name of the one and only cookie
pub const COOKIE_NAME: &str = "SESSION";

/// Cookie lifetime. A ceremony left pending longer than this is abandoned.
pub const SESSION_TTL_SECS: i64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("malformed session cookie: {0}")]
    Malformed(&'static str),

    #[error("session cookie failed authentication")]
    Decrypt,

    #[error("session encryption failed")]
    Encrypt,

    #[error("session payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid cookie header: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// Key/value bag for the lifetime of one request, round-tripped through the cookie.
pub struct SessionState {
    entries: Map<String, Value>,
    context: RequestContext,
    cipher: Arc<SessionCipher>,
}

impl SessionState {
    /// An empty session
    pub fn new(cipher: Arc<SessionCipher>, context: RequestContext) -> Self {
        Self {
            entries: Map::new(),
            context,
            cipher,
        }
    }

    /// Rebuild the session from an inbound cookie value, failing closed.
    pub fn decode(cipher: Arc<SessionCipher>, context: RequestContext, cookie: Option<&str>) -> Self {
        let mut session = Self::new(cipher, context);
        if let Some(cookie) = cookie {
            match session.open(cookie) {
                Ok(entries) => session.entries = entries,
                Err(e) => tracing::warn!(error = %e, "Discarding unreadable {COOKIE_NAME} cookie"),
            }
        }
        session
    }

    fn open(&self, cookie: &str) -> Result<Map<String, Value>, SessionError> {
        let plaintext = self.cipher.open(cookie)?;
        match serde_json::from_slice(&plaintext)? {
            Value::Object(entries) => Ok(entries),
            _ => Err(SessionError::Malformed("payload is not an object")),
        }
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .insert(key.to_string(), Value::String(value.into()));
    }

    /// Bytes are kept as base64 strings; undecodable entries read as absent
    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.get_string(key)
            .and_then(|text| codec::decode_bytes(text).ok())
    }

    pub fn set_bytes(&mut self, key: &str, value: &[u8]) {
        self.set_string(key, codec::encode_bytes(value));
    }

    pub fn get_json(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn set_json(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Seal the current entries into a cookie value
    pub fn encode(&self) -> Result<String, SessionError> {
        let json = serde_json::to_vec(&self.entries)?;
        self.cipher.seal(&json)
    }

    pub fn to_cookie(&self) -> Result<Cookie<'static>, SessionError> {
        Ok(Cookie::build((COOKIE_NAME, self.encode()?))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.context.is_secure())
            .path("/")
            .domain(self.context.hostname().to_string())
            .max_age(time::Duration::seconds(SESSION_TTL_SECS))
            .build())
    }

    /// Attach the sealed session cookie to `response`.
    pub fn to_response(&self, response: impl IntoResponse) -> Result<Response, SessionError> {
        let cookie = self.to_cookie()?;
        let mut response = response.into_response();
        response
            .headers_mut()
            .append(SET_COOKIE, HeaderValue::from_str(&cookie.to_string())?);
        Ok(response)
    }
}

/// A `Set-Cookie` that makes the browser drop the session cookie
pub fn removal_cookie(context: &RequestContext) -> Cookie<'static> {
    let mut cookie = Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .domain(context.hostname().to_string())
        .build();
    cookie.make_removal();
    cookie
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .field("context", &self.context)
            .finish()
    }
}

impl FromRequestParts<AppState> for SessionState {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let context = RequestContext::from_parts(parts);
        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(COOKIE_NAME).map(|c| c.value().to_string());
        Ok(Self::decode(state.cipher.clone(), context, cookie.as_deref()))
    }
}
