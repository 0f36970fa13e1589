//! Configuration for mailbox sessions.
//!
//! Use [`MailboxConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use tempmail_sync::MailboxConfig;
//!
//! let config = MailboxConfig::builder()
//!     .build()
//!     .expect("valid config");
//! assert!(config.auto_create);
//! ```

use crate::address::DEFAULT_DOMAINS;
use crate::error::{Error, Result};
use crate::proxy::Socks5Proxy;
use email_address::EmailAddress;
use reqwest::Url;
use std::time::Duration;

/// Default page that issues the `auth_token` cookie.
pub const DEFAULT_WEB_URL: &str = "https://mail.cx/zh/";
/// Default base of the mailbox REST API.
pub const DEFAULT_API_BASE: &str = "https://mail.cx/api/api/v1/mailbox";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Configuration for a mailbox session.
///
/// Create using [`MailboxConfig::builder()`].
#[derive(Debug, Clone)]
pub struct MailboxConfig {
    /// Address to bind instead of generating one.
    email: Option<EmailAddress>,
    /// Generate a fresh address on every successful `connect()`.
    pub auto_create: bool,
    /// Domains that generated addresses are drawn from (never empty).
    domains: Vec<String>,
    /// Service endpoints.
    pub endpoints: Endpoints,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// `Accept-Language` sent with every request.
    pub accept_language: String,
    /// Optional SOCKS5 proxy for all requests.
    pub proxy: Option<Socks5Proxy>,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
    /// Polling configuration for wait operations.
    pub polling: PollingConfig,
}

impl MailboxConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> MailboxConfigBuilder {
        MailboxConfigBuilder::default()
    }

    /// Returns the preset address, if one was configured.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_ref().map(EmailAddress::as_str)
    }

    /// Returns the domain list used for address generation.
    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.domains
    }
}

/// Remote endpoints of the mailbox service.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Web page whose response sets the `auth_token` cookie.
    pub web_url: Url,
    /// Base URL of the mailbox API; messages live at `{api_base}/{address}`.
    pub api_base: Url,
}

impl Endpoints {
    /// URL listing the messages of `address`.
    #[must_use]
    pub fn mailbox_url(&self, address: &str) -> String {
        format!("{}/{address}", self.api_base.as_str().trim_end_matches('/'))
    }

    /// URL of a single message.
    #[must_use]
    pub fn message_url(&self, address: &str, id: &str) -> String {
        format!("{}/{id}", self.mailbox_url(address))
    }
}

/// Timeout configuration for HTTP requests.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for a whole request, including the body.
    pub request: Duration,
    /// Timeout for establishing the connection.
    pub connect: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
            connect: Duration::from_secs(10),
        }
    }
}

/// Polling configuration for wait operations.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Interval between polling attempts when waiting for a message.
    pub interval: Duration,
    /// Maximum time to wait for a qualifying message.
    pub max_wait: Duration,
    /// Number of records requested per poll.
    pub fetch_limit: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300), // 5 minutes
            fetch_limit: 20,
        }
    }
}

/// Validates an email address format.
fn validate_email(email: &str) -> Result<EmailAddress> {
    EmailAddress::parse_with_options(email, email_address::Options::default()).map_err(|_| {
        Error::InvalidEmailFormat {
            email: email.to_string(),
        }
    })
}

fn parse_url(kind: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidConfig {
        message: format!("{kind} '{raw}' is not a valid URL: {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidConfig {
            message: format!("{kind} '{raw}' must use http or https"),
        });
    }
    Ok(url)
}

/// Builder for [`MailboxConfig`].
#[derive(Debug, Default)]
pub struct MailboxConfigBuilder {
    email: Option<String>,
    auto_create: Option<bool>,
    domains: Option<Vec<String>>,
    web_url: Option<String>,
    api_base: Option<String>,
    user_agent: Option<String>,
    accept_language: Option<String>,
    proxy: Option<Socks5Proxy>,
    timeouts: Option<TimeoutConfig>,
    polling: Option<PollingConfig>,
}

impl MailboxConfigBuilder {
    /// Presets the mailbox address.
    ///
    /// The preset address is only kept when `auto_create` is disabled; otherwise
    /// `connect()` replaces it with a generated one.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Controls whether `connect()` generates a fresh address (default: true).
    #[must_use]
    pub fn auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = Some(auto_create);
        self
    }

    /// Replaces the domain list used for address generation.
    #[must_use]
    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    /// Overrides the handshake page URL.
    #[must_use]
    pub fn web_url(mut self, url: impl Into<String>) -> Self {
        self.web_url = Some(url.into());
        self
    }

    /// Overrides the mailbox API base URL.
    #[must_use]
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = Some(url.into());
        self
    }

    /// Overrides the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Overrides the `Accept-Language` header.
    #[must_use]
    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.accept_language = Some(value.into());
        self
    }

    /// Sets a SOCKS5 proxy for all requests.
    #[must_use]
    pub fn proxy(mut self, proxy: Socks5Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .request = timeout;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .connect = timeout;
        self
    }

    /// Sets polling configuration.
    #[must_use]
    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.polling = Some(polling);
        self
    }

    /// Sets the polling interval for wait operations.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.polling
            .get_or_insert_with(PollingConfig::default)
            .interval = interval;
        self
    }

    /// Sets the maximum wait time for wait operations.
    #[must_use]
    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.polling
            .get_or_insert_with(PollingConfig::default)
            .max_wait = max_wait;
        self
    }

    /// Sets how many records each poll requests.
    #[must_use]
    pub fn fetch_limit(mut self, limit: usize) -> Self {
        self.polling
            .get_or_insert_with(PollingConfig::default)
            .fetch_limit = limit;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the preset address, an endpoint URL or the domain
    /// list is invalid, or if the polling settings are zero.
    pub fn build(self) -> Result<MailboxConfig> {
        let email = self.email.as_deref().map(validate_email).transpose()?;

        let domains = self
            .domains
            .unwrap_or_else(|| DEFAULT_DOMAINS.iter().map(ToString::to_string).collect());
        if domains.is_empty() || domains.iter().any(|d| d.trim().is_empty()) {
            return Err(Error::InvalidConfig {
                message: "domain list must contain non-empty domains".into(),
            });
        }

        let endpoints = Endpoints {
            web_url: parse_url("web_url", self.web_url.as_deref().unwrap_or(DEFAULT_WEB_URL))?,
            api_base: parse_url(
                "api_base",
                self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE),
            )?,
        };

        let polling = self.polling.unwrap_or_default();
        if polling.interval.is_zero() {
            return Err(Error::InvalidConfig {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if polling.fetch_limit == 0 {
            return Err(Error::InvalidConfig {
                message: "fetch limit must be greater than zero".into(),
            });
        }

        Ok(MailboxConfig {
            email,
            auto_create: self.auto_create.unwrap_or(true),
            domains,
            endpoints,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            accept_language: self
                .accept_language
                .unwrap_or_else(|| DEFAULT_ACCEPT_LANGUAGE.to_string()),
            proxy: self.proxy,
            timeouts: self.timeouts.unwrap_or_default(),
            polling,
        })
    }
}
