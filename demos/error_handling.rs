//! Example: Proper error handling with retries.
//!
//! The plain session methods never fail; this example uses the `try_*`
//! forms to branch on the cause and retry transient failures.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example error_handling
//! ```

use std::time::Duration;
use tempmail_sync::{Error, ErrorCategory, MailboxConfig, MailboxSession, Message};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Connect with automatic retry for transient failures
async fn connect_with_retry(session: &mut MailboxSession) -> Result<(), Error> {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;

    loop {
        println!("Connection attempt {attempt}/{MAX_RETRIES}...");

        match session.try_connect().await {
            Ok(()) => {
                println!("Connected successfully!");
                return Ok(());
            }
            Err(e) => {
                println!("  Error: {e}");
                println!("  Category: {}", e.category());
                println!("  Retryable: {}", e.is_retryable());

                if !e.is_retryable() || attempt >= MAX_RETRIES {
                    return Err(e);
                }

                println!("  Retrying in {backoff:?}...");
                tokio::time::sleep(backoff).await;
                backoff *= 2; // Exponential backoff
                attempt += 1;
            }
        }
    }
}

/// Fetch with error classification
async fn fetch_with_error_handling(session: &MailboxSession) -> Result<Vec<Message>, Error> {
    match session.try_fetch_messages(20, None).await {
        Ok(messages) => Ok(messages),
        Err(e) => match e.category() {
            ErrorCategory::State => {
                // Not connected (yet): nothing to fetch
                println!("Session not ready: {e}");
                Ok(Vec::new())
            }
            ErrorCategory::Network | ErrorCategory::Protocol | ErrorCategory::Auth => {
                // May clear up; the token might also have expired
                println!("Transient error (retryable: {}): {e}", e.is_retryable());
                Err(e)
            }
            ErrorCategory::Parse | ErrorCategory::Configuration => {
                println!("Unexpected error: {e}");
                Err(e)
            }
        },
    }
}

#[tokio::main]
async fn main() {
    println!("tempmail-sync - Error Handling Example\n");
    println!("======================================\n");

    let config = match MailboxConfig::builder()
        .request_timeout(Duration::from_secs(10))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("This error is NOT retryable - fix your configuration");
            std::process::exit(1);
        }
    };

    let mut session = match MailboxSession::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to set up HTTP client: {e}");
            std::process::exit(1);
        }
    };

    // Fetching before connecting is a state error, not a crash
    let _ = fetch_with_error_handling(&session).await;

    if let Err(e) = connect_with_retry(&mut session).await {
        eprintln!("\nFailed to connect after {MAX_RETRIES} attempts");
        eprintln!("Final error: {e}");
        std::process::exit(1);
    }

    println!("\nFetching messages...");
    match fetch_with_error_handling(&session).await {
        Ok(messages) => println!("{} message(s) since the mailbox was created", messages.len()),
        Err(e) => eprintln!("Fetch failed: {e}"),
    }

    // Expired token? Refresh it and keep the address.
    if let Err(e) = session.refresh_token().await {
        eprintln!("Token refresh failed (non-critical): {e}");
    }

    session.disconnect();
    println!("Done!");
}
