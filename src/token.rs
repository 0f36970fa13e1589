//! Bearer token acquisition.
//!
//! The mailbox service hands out its bearer token as an `auth_token` cookie on
//! its web page. A session only depends on the [`TokenSource`] capability, so
//! the handshake can be replaced by a fake in tests.

use crate::error::{Error, Result};
use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::COOKIE;
use reqwest::Url;
use secrecy::SecretString;
use tracing::{debug, instrument};

/// Cookie carrying the bearer token in the handshake response.
pub const AUTH_COOKIE: &str = "auth_token";
/// Cookie hinting which address the token should be bound to.
pub const ADDRESS_HINT_COOKIE: &str = "mtd_address";

/// Characters left unescaped in the address hint (letters, digits, `_.-~/`).
const HINT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Source of bearer tokens for the mailbox API.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Acquires a fresh token, optionally hinting the address it should serve.
    async fn acquire(&self, hint: Option<&str>) -> Result<SecretString>;
}

/// Acquires tokens through the web page cookie handshake.
#[derive(Debug, Clone)]
pub struct CookieTokenSource {
    http: reqwest::Client,
    web_url: Url,
}

impl CookieTokenSource {
    /// Creates a token source issuing its handshake with `http` against `web_url`.
    #[must_use]
    pub fn new(http: reqwest::Client, web_url: Url) -> Self {
        Self { http, web_url }
    }
}

#[async_trait]
impl TokenSource for CookieTokenSource {
    #[instrument(
        name = "token::acquire",
        skip(self),
        fields(url = %self.web_url)
    )]
    async fn acquire(&self, hint: Option<&str>) -> Result<SecretString> {
        let mut request = self.http.get(self.web_url.clone());
        if let Some(address) = hint.filter(|a| !a.is_empty()) {
            request = request.header(COOKIE, address_hint_cookie(address));
        }

        let response = request.send().await.map_err(|source| Error::Handshake {
            url: self.web_url.to_string(),
            source,
        })?;

        debug!(status = %response.status(), "Handshake response received");

        let mut available = Vec::new();
        for cookie in response.cookies() {
            if cookie.name() == AUTH_COOKIE {
                let token = decode_token(cookie.value());
                if !token.is_empty() {
                    debug!(token = %mask(&token), "Got auth token");
                    return Ok(SecretString::from(token));
                }
            }
            available.push(cookie.name().to_string());
        }

        Err(Error::MissingAuthCookie { available })
    }
}

/// Builds the `Cookie` header value carrying the address hint.
pub(crate) fn address_hint_cookie(address: &str) -> String {
    format!(
        "{ADDRESS_HINT_COOKIE}={}",
        utf8_percent_encode(address, HINT_ENCODE_SET)
    )
}

/// URL-decodes a raw cookie value and strips whitespace and wrapping quotes.
pub(crate) fn decode_token(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8_lossy()
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string()
}

/// Renders a token for logs without revealing it.
pub(crate) fn mask(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}…")
}
