//! Example: Create a mailbox and wait for a verification code.
//!
//! Prints a fresh disposable address, then polls for up to two minutes for a
//! message carrying a code.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example basic_code
//! ```

use std::time::Duration;
use tempmail_sync::{MailboxConfig, MailboxSession, WaitOptions};

#[tokio::main]
async fn main() -> tempmail_sync::Result<()> {
    let config = MailboxConfig::builder()
        .poll_interval(Duration::from_secs(3))
        .max_wait(Duration::from_secs(120))
        .build()?;

    let mut guard = MailboxSession::new(config)?.into_guard();
    guard.try_connect().await?;

    let address = guard.address().unwrap_or_default().to_string();
    println!("Send the verification mail to: {address}");
    println!("Waiting up to 2 minutes...");

    let options = WaitOptions::from_polling(&guard.config().polling);
    match guard.wait_for_code(&options).await {
        Some((message, code)) => {
            println!("\nFrom:    {}", message.sender());
            println!("Subject: {}", message.subject());
            println!("Code:    {code}");
        }
        None => println!("\nNo code arrived in time"),
    }

    // `guard` disconnects when it goes out of scope.
    Ok(())
}
