//! The message entity returned by a mailbox session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// One retrieved email.
///
/// A `Message` is a transient, immutable view of a record in the remote
/// mailbox. Its [`id`](Self::id) is the only identity used for deduplication.
///
/// Sessions construct messages from wire records; the `with_*` methods exist
/// for building messages by hand, e.g. to run extraction over stored content.
///
/// ```
/// use tempmail_sync::Message;
///
/// let message = Message::new("m-1")
///     .with_subject("Welcome")
///     .with_html("<p>Your code: <b>482913</b></p>");
/// assert_eq!(message.id(), "m-1");
/// assert!(message.body_text().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    id: String,
    subject: String,
    sender: String,
    recipient: String,
    body_text: String,
    body_html: Option<String>,
    received_at: Option<DateTime<Utc>>,
    headers: BTreeMap<String, String>,
}

impl Message {
    /// Creates an empty message with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: String::new(),
            sender: String::new(),
            recipient: String::new(),
            body_text: String::new(),
            body_html: None,
            received_at: None,
            headers: BTreeMap::new(),
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Sets the sender address.
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    /// Sets the recipient address.
    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = recipient.into();
        self
    }

    /// Sets the plain-text body.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.body_text = text.into();
        self
    }

    /// Sets the HTML body. An empty string clears it.
    #[must_use]
    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        let html = html.into();
        self.body_html = (!html.is_empty()).then_some(html);
        self
    }

    /// Sets the receive timestamp.
    #[must_use]
    pub fn with_received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Message id, unique within the mailbox.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subject line.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sender address.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Recipient address (the bound mailbox).
    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Plain-text body, possibly empty.
    #[must_use]
    pub fn body_text(&self) -> &str {
        &self.body_text
    }

    /// Raw HTML body, if the message has one.
    #[must_use]
    pub fn body_html(&self) -> Option<&str> {
        self.body_html.as_deref()
    }

    /// When the service received the message, if known.
    #[must_use]
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.received_at
    }

    /// Message headers.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}
