//! Internal module for building the HTTP transport.
//!
//! One `reqwest::Client` is created per session; dropping it releases the
//! connection pool.

use crate::config::MailboxConfig;
use crate::error::{Error, Result};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, ORIGIN, REFERER, USER_AGENT,
};
use tracing::{debug, instrument};

/// Builds the HTTP client used for every request of a session.
#[instrument(
    name = "connection::build_client",
    skip_all,
    fields(proxy_enabled = config.proxy.is_some())
)]
pub(crate) fn build_http_client(config: &MailboxConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .default_headers(default_headers(config))
        .timeout(config.timeouts.request)
        .connect_timeout(config.timeouts.connect);

    if let Some(proxy) = &config.proxy {
        debug!(proxy = %proxy, "Routing requests via SOCKS5 proxy");
        builder = builder.proxy(proxy.to_reqwest()?);
    }

    builder.build().map_err(|source| Error::HttpClient { source })
}

/// Browser-like headers sent with every request.
fn default_headers(config: &MailboxConfig) -> HeaderMap {
    let web_url = &config.endpoints.web_url;
    let mut headers = HeaderMap::new();

    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    let values = [
        (USER_AGENT, config.user_agent.clone()),
        (ACCEPT_LANGUAGE, config.accept_language.clone()),
        (ORIGIN, web_url.origin().ascii_serialization()),
        (REFERER, web_url.to_string()),
    ];
    for (name, value) in values {
        // Values that are not valid header text are skipped rather than sent mangled.
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_headers() {
        let config = MailboxConfig::builder()
            .web_url("https://mail.cx/zh/")
            .user_agent("test-agent/1.0")
            .build()
            .unwrap();

        let headers = default_headers(&config);
        assert_eq!(headers[USER_AGENT], "test-agent/1.0");
        assert_eq!(headers[ORIGIN], "https://mail.cx");
        assert_eq!(headers[REFERER], "https://mail.cx/zh/");
        assert_eq!(headers[ACCEPT], "*/*");
    }

    #[test]
    fn test_invalid_header_value_is_skipped() {
        let config = MailboxConfig::builder()
            .user_agent("bad\nagent")
            .build()
            .unwrap();

        let headers = default_headers(&config);
        assert!(!headers.contains_key(USER_AGENT));
    }

    #[test]
    fn test_build_client() {
        let config = MailboxConfig::builder().build().unwrap();
        assert!(build_http_client(&config).is_ok());
    }
}
