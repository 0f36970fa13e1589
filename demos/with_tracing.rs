//! Example: Using tracing for observability.
//!
//! This example demonstrates how to enable structured logging using
//! the `tracing` ecosystem. All major operations in tempmail-sync emit
//! tracing spans and events.
//!
//! # Usage
//!
//! ```bash
//! # Set log level (trace, debug, info, warn, error)
//! export RUST_LOG=tempmail_sync=debug
//!
//! cargo run --example with_tracing
//! ```

use std::time::Duration;
use tempmail_sync::{MailboxConfig, MailboxSession, WaitOptions};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> tempmail_sync::Result<()> {
    // Use RUST_LOG to control log levels, e.g. RUST_LOG=tempmail_sync=debug,info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tempmail_sync=info")),
        )
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("Starting tempmail-sync example");

    let config = MailboxConfig::builder()
        .poll_interval(Duration::from_secs(5))
        .max_wait(Duration::from_secs(30))
        .build()?;

    let mut session = MailboxSession::new(config)?;

    // Emits spans for the handshake and address creation
    if !session.connect().await {
        tracing::error!("Could not connect to the mailbox service");
        return Ok(());
    }

    tracing::info!(address = ?session.address(), "Mailbox ready");

    // Emits one fetch span per poll
    let options = WaitOptions::from_polling(&session.config().polling);
    match session.wait_for_message(&options).await {
        Some(message) => {
            tracing::info!(message_id = %message.id(), subject = %message.subject(), "Got message");
        }
        None => tracing::warn!("No message within the wait window"),
    }

    session.disconnect();

    tracing::info!("Example completed successfully");

    Ok(())
}
