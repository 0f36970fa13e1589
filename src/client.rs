//! Mailbox session: token handshake, address binding, fetch, delete and wait.
//!
//! The [`MailboxSession`] is the main entry point for this crate. It provides
//! async methods to:
//!
//! - Acquire a bearer token and bind a (generated) address
//! - Fetch and delete the messages of the bound mailbox
//! - Wait for a fresh message, optionally until it yields a code or link
//!
//! Every operation comes in two forms. The `try_*` form returns a [`Result`];
//! the plain form logs the failure and degrades to an empty list, `false` or
//! `None`, so an automation flow never has to handle errors it cannot act on.
//!
//! # Example
//!
//! ```no_run
//! use tempmail_sync::{MailboxConfig, MailboxSession, WaitOptions};
//!
//! # async fn example() -> tempmail_sync::Result<()> {
//! let config = MailboxConfig::builder().build()?;
//! let mut session = MailboxSession::new(config)?;
//!
//! if session.connect().await {
//!     println!("Send the code to {}", session.address().unwrap_or_default());
//!     if let Some((_, code)) = session.wait_for_code(&WaitOptions::default()).await {
//!         println!("Got code: {code}");
//!     }
//! }
//!
//! session.disconnect();
//! # Ok(())
//! # }
//! ```

use crate::address::AddressGenerator;
use crate::clock::{Clock, SystemClock};
use crate::config::{MailboxConfig, PollingConfig};
use crate::connection;
use crate::error::{Error, ErrorCategory, Result};
use crate::extract::Extractor;
use crate::matcher::Matcher;
use crate::message::Message;
use crate::parser;
use crate::session::RemoteMailbox;
use crate::token::{CookieTokenSource, TokenSource};
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use std::collections::HashSet;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Observable lifecycle state of a [`MailboxSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No token or no address yet.
    Unbound,
    /// Token and address are both established.
    Bound,
    /// Transport released; the session can no longer issue requests.
    Disconnected,
}

/// Parameters of a wait operation.
///
/// ```
/// use std::time::Duration;
/// use tempmail_sync::WaitOptions;
///
/// let options = WaitOptions::new(Duration::from_secs(120), Duration::from_secs(3))
///     .subject("verify")
///     .sender("noreply@");
/// assert_eq!(options.limit, 20);
/// ```
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Give up once this much time has passed since the wait started.
    pub timeout: Duration,
    /// Pause before every poll.
    pub interval: Duration,
    /// Records requested per poll.
    pub limit: usize,
    /// Case-insensitive substring the subject must contain.
    pub subject: Option<String>,
    /// Case-insensitive substring the sender must contain.
    pub sender: Option<String>,
}

impl WaitOptions {
    /// Creates options with the given timeout and poll interval.
    #[must_use]
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            ..Self::default()
        }
    }

    /// Creates options from a session's polling configuration.
    #[must_use]
    pub fn from_polling(polling: &PollingConfig) -> Self {
        Self {
            timeout: polling.max_wait,
            interval: polling.interval,
            limit: polling.fetch_limit,
            subject: None,
            sender: None,
        }
    }

    /// Only accept messages whose subject contains `subject`.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Only accept messages whose sender contains `sender`.
    #[must_use]
    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Freshness and filter check. Deduplication is the caller's job.
    fn qualifies(&self, message: &Message, started: DateTime<Utc>) -> bool {
        if message.received_at().is_some_and(|at| at < started) {
            return false;
        }
        contains_ignore_case(message.subject(), self.subject.as_deref())
            && contains_ignore_case(message.sender(), self.sender.as_deref())
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::from_polling(&PollingConfig::default())
    }
}

fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle.filter(|n| !n.is_empty()) {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

/// Session against one disposable mailbox.
///
/// Create using [`MailboxSession::new`] (or [`MailboxSession::with_parts`] to
/// inject the token handshake and the clock).
///
/// # Lifecycle
///
/// 1. [`connect`](Self::connect) acquires a token and binds an address
/// 2. Use [`fetch_messages`](Self::fetch_messages), [`wait_for_message`](Self::wait_for_message) and friends
/// 3. Call [`disconnect`](Self::disconnect) when done (or use [`into_guard`](Self::into_guard))
///
/// A disconnected session stays disconnected; create a new one to start over.
pub struct MailboxSession {
    config: MailboxConfig,
    remote: Option<RemoteMailbox>,
    tokens: Option<Arc<dyn TokenSource>>,
    clock: Arc<dyn Clock>,
    generator: AddressGenerator,
    address: Option<String>,
    token: Option<SecretString>,
    created_at: Option<DateTime<Utc>>,
}

impl MailboxSession {
    /// Creates an unbound session using the cookie handshake and the system clock.
    ///
    /// No request is sent until [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. a bad proxy).
    pub fn new(config: MailboxConfig) -> Result<Self> {
        let http = connection::build_http_client(&config)?;
        let tokens = Arc::new(CookieTokenSource::new(
            http.clone(),
            config.endpoints.web_url.clone(),
        ));
        Ok(Self::assemble(config, http, tokens, Arc::new(SystemClock)))
    }

    /// Creates an unbound session with a custom token source and clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_parts(
        config: MailboxConfig,
        tokens: Arc<dyn TokenSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let http = connection::build_http_client(&config)?;
        Ok(Self::assemble(config, http, tokens, clock))
    }

    fn assemble(
        config: MailboxConfig,
        http: reqwest::Client,
        tokens: Arc<dyn TokenSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            remote: Some(RemoteMailbox::new(http, config.endpoints.clone())),
            tokens: Some(tokens),
            clock,
            generator: AddressGenerator::new(config.domains().iter().cloned()),
            address: config.email().map(ToString::to_string),
            token: None,
            created_at: None,
            config,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Token and address
    // ─────────────────────────────────────────────────────────────────────────

    /// Acquires a bearer token, hinting the bound address if there is one.
    ///
    /// On failure the previous token, if any, is kept.
    ///
    /// # Errors
    ///
    /// Returns an auth error if the handshake fails or yields no token.
    #[instrument(
        name = "MailboxSession::acquire_token",
        skip(self),
        fields(address = ?self.address)
    )]
    pub async fn try_acquire_token(&mut self) -> Result<()> {
        let tokens = self
            .tokens
            .as_ref()
            .ok_or(Error::Disconnected {
                operation: "acquire_token",
            })?;

        let token = tokens.acquire(self.address.as_deref()).await?;
        self.token = Some(token);
        debug!("Token acquired");
        Ok(())
    }

    /// Acquires a bearer token. Returns `false` (and logs why) on failure.
    pub async fn acquire_token(&mut self) -> bool {
        match self.try_acquire_token().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to acquire token");
                false
            }
        }
    }

    /// Re-runs the handshake for the bound address, replacing the token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if no address is bound, or an auth error
    /// if the handshake fails.
    pub async fn refresh_token(&mut self) -> Result<()> {
        if self.address.is_none() {
            return Err(Error::NotConnected {
                operation: "refresh_token",
            });
        }
        self.try_acquire_token().await
    }

    /// Generates a fresh address and binds it.
    ///
    /// The creation instant becomes the default lower bound of
    /// [`fetch_messages`](Self::fetch_messages) and is always strictly later
    /// than the previous one. An existing token is kept.
    pub fn create_address(&mut self) -> String {
        let address = self.generator.generate();

        let mut now = self.clock.now();
        if let Some(previous) = self.created_at {
            if now <= previous {
                now = previous + TimeDelta::milliseconds(1);
            }
        }

        info!(address = %address, "Mailbox address created");
        self.address = Some(address.clone());
        self.created_at = Some(now);
        address
    }

    /// Acquires a token and binds an address according to the configured `auto_create`.
    ///
    /// See [`connect_with`](Self::connect_with).
    pub async fn connect(&mut self) -> bool {
        self.connect_with(self.config.auto_create).await
    }

    /// Acquires a token, then creates an address if `auto_create` is set or
    /// none is bound. Returns `true` only if both are established.
    ///
    /// A failed handshake leaves the session as it was.
    pub async fn connect_with(&mut self, auto_create: bool) -> bool {
        match self.try_connect_with(auto_create).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, category = %e.category(), "Failed to connect");
                false
            }
        }
    }

    /// Fallible form of [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns an error if the session is disconnected or the handshake fails.
    pub async fn try_connect(&mut self) -> Result<()> {
        self.try_connect_with(self.config.auto_create).await
    }

    /// Fallible form of [`connect_with`](Self::connect_with).
    ///
    /// # Errors
    ///
    /// Returns an error if the session is disconnected or the handshake fails.
    #[instrument(
        name = "MailboxSession::connect",
        skip(self),
        fields(proxy_enabled = self.config.proxy.is_some())
    )]
    pub async fn try_connect_with(&mut self, auto_create: bool) -> Result<()> {
        self.try_acquire_token().await?;

        if auto_create || self.address.is_none() {
            self.create_address();
        }

        debug!(address = ?self.address, "Session bound");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mailbox operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetches up to `limit` messages newer than a lower bound.
    ///
    /// The bound is `since` if given, else the address creation instant, else
    /// none. Messages already in a reused mailbox when the address was bound
    /// are therefore hidden unless an explicit `since` reaches back to them.
    /// A record is dropped when its timestamp is present and not after the bound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] when unbound, or a transport error.
    #[instrument(
        name = "MailboxSession::fetch_messages",
        skip(self),
        fields(address = ?self.address)
    )]
    pub async fn try_fetch_messages(
        &self,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>> {
        let (remote, address, token) = self.bound("fetch_messages")?;
        let records = remote.fetch_records(address, token, limit).await?;
        let lower_bound = since.or(self.created_at);

        let mut messages = Vec::with_capacity(records.len());
        for record in &records {
            let message = match parser::parse_record(record, address) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed record");
                    continue;
                }
            };

            let stale = match (message.received_at(), lower_bound) {
                (Some(at), Some(bound)) => at <= bound,
                _ => false,
            };
            if stale {
                continue;
            }

            messages.push(message);
        }

        debug!(
            fetched = records.len(),
            kept = messages.len(),
            "Filtered mailbox records"
        );
        Ok(messages)
    }

    /// Fetches messages, returning an empty list (and logging why) on failure.
    ///
    /// See [`try_fetch_messages`](Self::try_fetch_messages).
    pub async fn fetch_messages(&self, limit: usize, since: Option<DateTime<Utc>>) -> Vec<Message> {
        self.try_fetch_messages(limit, since)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, category = %e.category(), "Failed to fetch messages");
                Vec::new()
            })
    }

    /// Deletes one message of the bound mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] when unbound, or a transport error when
    /// the service does not answer `200 OK`.
    #[instrument(
        name = "MailboxSession::delete_message",
        skip(self),
        fields(address = ?self.address)
    )]
    pub async fn try_delete_message(&self, id: &str) -> Result<()> {
        let (remote, address, token) = self.bound("delete_message")?;
        remote.delete_record(address, id, token).await
    }

    /// Deletes one message. Returns `true` only on success.
    pub async fn delete_message(&self, id: &str) -> bool {
        match self.try_delete_message(id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(message_id = id, error = %e, "Failed to delete message");
                false
            }
        }
    }

    /// Releases the transport and the token. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        let had_transport = self.remote.take().is_some();
        self.tokens = None;
        self.token = None;

        if had_transport {
            info!(address = ?self.address, "Session disconnected");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Waiting
    // ─────────────────────────────────────────────────────────────────────────

    /// Polls until a qualifying message arrives or the timeout elapses.
    ///
    /// A message qualifies when it was not seen earlier in this call, its
    /// receive time (if known) is not before the call started, and it passes
    /// the subject and sender filters. Failed polls are logged and skipped,
    /// except on an unbound or disconnected session, where the wait returns
    /// `None` after the first poll instead of running out the timeout.
    #[instrument(
        name = "MailboxSession::wait_for_message",
        skip(self, options),
        fields(
            address = ?self.address,
            timeout_secs = options.timeout.as_secs(),
            interval_secs = options.interval.as_secs()
        )
    )]
    pub async fn wait_for_message(&self, options: &WaitOptions) -> Option<Message> {
        self.poll_until(options, |_| Some(()))
            .await
            .map(|(message, ())| message)
    }

    /// Like [`wait_for_message`](Self::wait_for_message), but returns `None`
    /// as soon as `cancel` completes.
    ///
    /// ```no_run
    /// # use tempmail_sync::{MailboxConfig, MailboxSession, WaitOptions};
    /// # async fn example(session: MailboxSession) {
    /// let interrupted = async {
    ///     let _ = tokio::signal::ctrl_c().await;
    /// };
    /// let message = session
    ///     .wait_for_message_until(&WaitOptions::default(), interrupted)
    ///     .await;
    /// # }
    /// ```
    pub async fn wait_for_message_until<F>(&self, options: &WaitOptions, cancel: F) -> Option<Message>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            found = self.wait_for_message(options) => found,
            () = cancel => {
                info!("Wait cancelled");
                None
            }
        }
    }

    /// Waits for a qualifying message in which `matcher` finds something.
    #[instrument(
        name = "MailboxSession::wait_for_match",
        skip(self, matcher, options),
        fields(matcher = %matcher.description())
    )]
    pub async fn wait_for_match(
        &self,
        matcher: &dyn Matcher,
        options: &WaitOptions,
    ) -> Option<(Message, String)> {
        let extractor = Extractor::shared();
        self.poll_until(options, |message| {
            extractor.extract_code_with(message, matcher)
        })
        .await
    }

    /// Waits for a qualifying message carrying a verification code.
    pub async fn wait_for_code(&self, options: &WaitOptions) -> Option<(Message, String)> {
        let extractor = Extractor::shared();
        self.poll_until(options, |message| extractor.extract_code(message, None))
            .await
    }

    /// Waits for a qualifying message carrying a link, optionally containing `keyword`.
    pub async fn wait_for_link(
        &self,
        keyword: Option<&str>,
        options: &WaitOptions,
    ) -> Option<(Message, String)> {
        let extractor = Extractor::shared();
        self.poll_until(options, |message| extractor.extract_link(message, keyword))
            .await
    }

    /// Converts this session into a guard that disconnects on drop.
    ///
    /// ```no_run
    /// use tempmail_sync::{MailboxConfig, MailboxSession, WaitOptions};
    ///
    /// # async fn example() -> tempmail_sync::Result<()> {
    /// let mut guard = MailboxSession::new(MailboxConfig::builder().build()?)?.into_guard();
    /// guard.try_connect().await?;
    /// let code = guard.wait_for_code(&WaitOptions::default()).await;
    /// // Disconnected here, even on early return.
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn into_guard(self) -> MailboxSessionGuard {
        MailboxSessionGuard { session: self }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the bound address, if any.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns the instant the current address was created, if one was.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.remote.is_none() {
            SessionState::Disconnected
        } else if self.token.is_some() && self.address.is_some() {
            SessionState::Bound
        } else {
            SessionState::Unbound
        }
    }

    /// Returns `true` if the session holds a token and an address.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Bound
    }

    /// Returns the configuration this session was created with.
    #[must_use]
    pub fn config(&self) -> &MailboxConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private methods
    // ─────────────────────────────────────────────────────────────────────────

    fn bound(&self, operation: &'static str) -> Result<(&RemoteMailbox, &str, &SecretString)> {
        let remote = self
            .remote
            .as_ref()
            .ok_or(Error::Disconnected { operation })?;
        match (&self.address, &self.token) {
            (Some(address), Some(token)) => Ok((remote, address, token)),
            _ => Err(Error::NotConnected { operation }),
        }
    }

    /// Shared wait loop: sleep, poll, and hand each new qualifying message to `select`.
    async fn poll_until<T>(
        &self,
        options: &WaitOptions,
        mut select: impl FnMut(&Message) -> Option<T>,
    ) -> Option<(Message, T)> {
        let started = floor_to_millis(self.clock.now());
        let mut seen: HashSet<String> = HashSet::new();
        let mut polls = 0u32;

        while self.elapsed_since(started) < options.timeout {
            self.clock.sleep(options.interval).await;
            polls += 1;

            let messages = match self.try_fetch_messages(options.limit, None).await {
                Ok(messages) => messages,
                Err(e) if e.category() == ErrorCategory::State => {
                    warn!(error = %e, "Stopping wait");
                    return None;
                }
                Err(e) => {
                    warn!(error = %e, poll = polls, "Poll failed, continuing");
                    continue;
                }
            };

            for message in messages {
                if !seen.insert(message.id().to_string()) {
                    continue;
                }
                if !options.qualifies(&message, started) {
                    debug!(message_id = %message.id(), "Message does not qualify");
                    continue;
                }
                if let Some(hit) = select(&message) {
                    info!(
                        message_id = %message.id(),
                        subject = %message.subject(),
                        polls,
                        "Message found"
                    );
                    return Some((message, hit));
                }
            }
        }

        info!(polls, "Wait timed out");
        None
    }

    fn elapsed_since(&self, started: DateTime<Utc>) -> Duration {
        (self.clock.now() - started).to_std().unwrap_or_default()
    }
}

/// Truncates to whole milliseconds, the precision of wire timestamps.
fn floor_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

impl std::fmt::Debug for MailboxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxSession")
            .field("address", &self.address)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// RAII guard for [`MailboxSession`] that disconnects on drop.
///
/// Created by [`MailboxSession::into_guard`]. Dereferences to the session.
pub struct MailboxSessionGuard {
    session: MailboxSession,
}

impl Deref for MailboxSessionGuard {
    type Target = MailboxSession;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl DerefMut for MailboxSessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

impl Drop for MailboxSessionGuard {
    fn drop(&mut self) {
        self.session.disconnect();
    }
}

impl std::fmt::Debug for MailboxSessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailboxSessionGuard")
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_wait_options_defaults() {
        let options = WaitOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(300));
        assert_eq!(options.interval, Duration::from_secs(5));
        assert_eq!(options.limit, 20);
        assert!(options.subject.is_none());
    }

    #[test]
    fn test_qualifies_filters_case_insensitively() {
        let options = WaitOptions::default().subject("VERIFY").sender("noreply");
        let message = Message::new("1")
            .with_subject("Please verify your email")
            .with_sender("NoReply@service.test")
            .with_received_at(at(100));

        assert!(options.qualifies(&message, at(100)));
        assert!(!options.qualifies(&message.clone().with_subject("Welcome"), at(100)));
    }

    #[test]
    fn test_qualifies_rejects_older_messages() {
        let options = WaitOptions::default();
        let old = Message::new("1").with_received_at(at(99));
        let undated = Message::new("2");

        assert!(!options.qualifies(&old, at(100)));
        assert!(options.qualifies(&undated, at(100)));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(contains_ignore_case("anything", Some("")));
        assert!(contains_ignore_case("", None));
        assert!(!contains_ignore_case("", Some("x")));
    }

    #[test]
    fn test_floor_to_millis() {
        let precise = Utc.timestamp_opt(10, 1_999_999).unwrap();
        assert_eq!(floor_to_millis(precise).timestamp_nanos_opt(), Some(10_001_000_000));
    }

    #[test]
    fn test_unbound_session_state() {
        let config = MailboxConfig::builder().build().unwrap();
        let mut session = MailboxSession::new(config).unwrap();

        assert_eq!(session.state(), SessionState::Unbound);
        assert!(session.address().is_none());

        session.disconnect();
        session.disconnect();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_preset_address_is_bound_without_token() {
        let config = MailboxConfig::builder()
            .email("preset@qabq.com")
            .build()
            .unwrap();
        let session = MailboxSession::new(config).unwrap();

        assert_eq!(session.address(), Some("preset@qabq.com"));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = MailboxConfig::builder().build().unwrap();
        let mut session = MailboxSession::new(config).unwrap();
        session.token = Some(SecretString::from("super-secret-token".to_string()));

        let debug = format!("{session:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
