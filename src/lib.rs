//! # tempmail-sync
//!
//! Async client for a disposable-inbox service, with verification code and link extraction.
//!
//! This crate provides a high-level, async API for:
//! - Provisioning a random mailbox address and a bearer token
//! - Fetching messages newer than the mailbox, and waiting for fresh ones
//! - Extracting verification codes and confirmation links from HTML or plain-text bodies
//!
//! ## Features
//!
//! - **`observability`**: Enables OpenTelemetry integration for distributed tracing.
//!   Without this feature, tracing spans are still emitted but require no OTEL dependencies.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tempmail_sync::{MailboxConfig, MailboxSession, WaitOptions};
//! use std::time::Duration;
//!
//! # async fn example() -> tempmail_sync::Result<()> {
//! let config = MailboxConfig::builder()
//!     .poll_interval(Duration::from_secs(3))
//!     .build()?;
//!
//! let mut session = MailboxSession::new(config)?;
//! session.try_connect().await?;
//! println!("Use {} to sign up", session.address().unwrap_or_default());
//!
//! // Wait up to two minutes for a message carrying a code
//! let options = WaitOptions::new(Duration::from_secs(120), Duration::from_secs(3));
//! if let Some((message, code)) = session.wait_for_code(&options).await {
//!     println!("{} -> {code}", message.subject());
//! }
//!
//! session.disconnect();
//! # Ok(())
//! # }
//! ```
//!
//! ## Offline Extraction
//!
//! ```
//! use tempmail_sync::{Extractor, Message};
//!
//! let message = Message::new("1").with_html(
//!     r#"<p>Code: <b>739201</b></p><a href="https://example.com/verify?t=1">Verify</a>"#,
//! );
//!
//! let info = Extractor::default().extract_info(&message);
//! assert_eq!(info.primary_code.as_deref(), Some("739201"));
//! assert_eq!(info.verification_link.as_deref(), Some("https://example.com/verify?t=1"));
//! ```
//!
//! ## Custom Pattern Matching
//!
//! ```
//! use tempmail_sync::matcher::{ClosureMatcher, RegexMatcher};
//! use std::borrow::Cow;
//!
//! let matcher = RegexMatcher::case_insensitive(r"token=([a-f0-9]{32})").unwrap();
//!
//! let custom = ClosureMatcher::new(
//!     |text| {
//!         text.lines()
//!             .find(|line| line.starts_with("SECRET:"))
//!             .map(|line| Cow::Owned(line.trim_start_matches("SECRET:").trim().to_string()))
//!     },
//!     "secret extractor"
//! );
//! ```
//!
//! ## RAII Guard for Automatic Cleanup
//!
//! ```no_run
//! use tempmail_sync::{MailboxConfig, MailboxSession, WaitOptions};
//!
//! # async fn example() -> tempmail_sync::Result<()> {
//! let mut guard = MailboxSession::new(MailboxConfig::builder().build()?)?.into_guard();
//! guard.try_connect().await?;
//! let link = guard.wait_for_link(Some("verify"), &WaitOptions::default()).await;
//! // Guard disconnects when dropped
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Plain session operations never fail: they log and return an empty list,
//! `false` or `None`. The `try_*` forms return [`Error`], and
//! [`Error::is_retryable`] tells transient failures apart:
//!
//! ```
//! use tempmail_sync::Error;
//!
//! fn handle_error(error: &Error) {
//!     if error.is_retryable() {
//!         println!("Transient error, can retry: {}", error);
//!     } else {
//!         println!("Permanent error: {}", error);
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. All major operations emit spans with
//! structured fields suitable for distributed tracing.
//!
//! ### Span Naming Convention
//!
//! - `MailboxSession::connect` - Token handshake and address binding
//! - `MailboxSession::acquire_token` - Token handshake
//! - `MailboxSession::fetch_messages` - Mailbox listing
//! - `MailboxSession::delete_message` - Message deletion
//! - `MailboxSession::wait_for_message` - Waiting for a message
//! - `MailboxSession::wait_for_match` - Waiting for a matcher hit
//! - `token::acquire` - Cookie handshake request
//! - `session::fetch_records` / `session::delete_record` - REST calls
//! - `connection::build_client` - HTTP client setup
//!
//! ### Standard Fields
//!
//! - `address` - Bound mailbox address
//! - `proxy_enabled` - Whether proxy is used
//! - `matcher` - Matcher description
//! - `message_id` - Message id
//! - `timeout_secs` / `interval_secs` - Wait parameters
//!
//! Tokens are never logged in full. Enable the `observability` feature for OpenTelemetry integration.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod address;
pub mod clock;
pub mod config;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod message;
pub mod proxy;
pub mod token;

// Internal modules
mod client;
mod connection;
mod facade;
mod html;
mod parser;
mod session;

// Re-exports for ergonomic API
pub use address::{generate_address, AddressGenerator};
pub use client::{MailboxSession, MailboxSessionGuard, SessionState, WaitOptions};
pub use clock::{Clock, SystemClock};
pub use config::{Endpoints, MailboxConfig, MailboxConfigBuilder, PollingConfig, TimeoutConfig};
pub use email_address::EmailAddress;
pub use error::{Error, ErrorCategory, Result};
pub use extract::{CodePattern, ExtractionRules, ExtractionSummary, Extractor};
pub use facade::TempMail;
pub use message::Message;
pub use proxy::{ProxyAuth, Socks5Proxy};
pub use secrecy::SecretString;
pub use token::{CookieTokenSource, TokenSource};
