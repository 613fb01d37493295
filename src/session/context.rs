use axum::http::header::HOST;
use axum::http::request::Parts;

/// Scheme and host of the request being served.
///
/// Supplies the expected WebAuthn origin and the cookie attributes
/// (`Secure`, `Domain`). Behind a TLS-terminating proxy the scheme comes
/// from `X-Forwarded-Proto`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    scheme: String,
    host: String,
}

impl RequestContext {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let scheme = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .or_else(|| parts.uri.scheme_str().map(str::to_string))
            .unwrap_or_else(|| "http".to_string());

        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        Self { scheme, host }
    }

    /// `scheme://host[:port]`, as a browser reports it in clientDataJSON
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Host without the port, used as the cookie `Domain`
    pub fn hostname(&self) -> &str {
        if self.host.starts_with('[') {
            // IPv6 literal: keep the brackets, drop the port
            return match self.host.find(']') {
                Some(end) => &self.host[..=end],
                None => &self.host,
            };
        }
        match self.host.rsplit_once(':') {
            Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
            _ => &self.host,
        }
    }

    pub fn is_secure(&self) -> bool {
        self.scheme.eq_ignore_ascii_case("https")
    }
}
