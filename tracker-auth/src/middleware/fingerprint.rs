//! Client fingerprint derived from request headers.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use sha2::{Digest, Sha256};
use std::convert::Infallible;

/// Headers that make up the fingerprint, in hashing order.
///
/// Only headers a client keeps constant across calls; `Accept` and
/// `Accept-Encoding` vary per request from the same browser.
const FINGERPRINT_HEADERS: [header::HeaderName; 2] = [header::USER_AGENT, header::ACCEPT_LANGUAGE];

/// SHA-256 hex digest identifying the calling client.
///
/// Missing headers hash as empty values, so the extractor never rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut hasher = Sha256::new();
        for name in FINGERPRINT_HEADERS.iter() {
            let value = headers
                .get(name)
                .map(|v| v.as_bytes())
                .unwrap_or_default();
            hasher.update(name.as_str().as_bytes());
            hasher.update(b"=");
            hasher.update(value);
            hasher.update(b"\n");
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Fingerprint
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Fingerprint::from_headers(&parts.headers))
    }
}
