//! One-line entry points for scripts.
//!
//! [`TempMail`] bundles session creation with the shared default [`Extractor`].

use crate::client::MailboxSession;
use crate::config::MailboxConfig;
use crate::error::Result;
use crate::extract::{ExtractionSummary, Extractor};
use crate::message::Message;

/// Static convenience API over [`MailboxSession`] and [`Extractor`].
///
/// ```no_run
/// use tempmail_sync::{MailboxConfig, TempMail};
///
/// # async fn example() -> tempmail_sync::Result<()> {
/// let mut session = TempMail::create_temp_email(MailboxConfig::builder().build()?)?;
/// session.try_connect().await?;
///
/// for message in session.fetch_messages(10, None).await {
///     if let Some(code) = TempMail::extract_code(&message, None) {
///         println!("{}: {code}", message.subject());
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TempMail;

impl TempMail {
    /// Creates an unconnected session for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn create_temp_email(config: MailboxConfig) -> Result<MailboxSession> {
        MailboxSession::new(config)
    }

    /// Extracts a verification code with the default rules or a custom pattern.
    ///
    /// See [`Extractor::extract_code`].
    #[must_use]
    pub fn extract_code(message: &Message, pattern: Option<&str>) -> Option<String> {
        Extractor::shared().extract_code(message, pattern)
    }

    /// Extracts a confirmation link, optionally containing `keyword`.
    ///
    /// See [`Extractor::extract_link`].
    #[must_use]
    pub fn extract_link(message: &Message, keyword: Option<&str>) -> Option<String> {
        Extractor::shared().extract_link(message, keyword)
    }

    /// Runs every extraction over the message.
    #[must_use]
    pub fn extract_info(message: &Message) -> ExtractionSummary {
        Extractor::shared().extract_info(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_extraction() {
        let message = Message::new("1")
            .with_text("Your code is 482913. Confirm at https://s.test/confirm?x=1");

        assert_eq!(TempMail::extract_code(&message, None).as_deref(), Some("482913"));
        assert_eq!(
            TempMail::extract_link(&message, Some("confirm")).as_deref(),
            Some("https://s.test/confirm?x=1")
        );
        assert_eq!(TempMail::extract_info(&message).primary_code.as_deref(), Some("482913"));
    }

    #[test]
    fn test_create_temp_email_is_unconnected() {
        let session = TempMail::create_temp_email(MailboxConfig::builder().build().unwrap()).unwrap();
        assert!(!session.is_connected());
    }
}
