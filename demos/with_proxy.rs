//! Example: Route every request through a SOCKS5 proxy.
//!
//! Useful when the mailbox service must be reached from a specific network
//! location, or when running many sessions from one host.
//!
//! # Usage
//!
//! ```bash
//! export PROXY_HOST="proxy.example.com"
//! export PROXY_PORT="1080"
//! # Optional: for authenticated proxies
//! export PROXY_USER="username"
//! export PROXY_PASS="password"
//!
//! cargo run --example with_proxy
//! ```

use std::env;
use std::time::Duration;
use tempmail_sync::{MailboxConfig, MailboxSession, Socks5Proxy, WaitOptions};

#[tokio::main]
async fn main() -> tempmail_sync::Result<()> {
    // Proxy configuration
    let proxy_host = env::var("PROXY_HOST").expect("PROXY_HOST environment variable required");
    let proxy_port: u16 = env::var("PROXY_PORT")
        .expect("PROXY_PORT environment variable required")
        .parse()
        .expect("PROXY_PORT must be a valid port number");

    // Create proxy (with optional authentication)
    let proxy = match (env::var("PROXY_USER").ok(), env::var("PROXY_PASS").ok()) {
        (Some(user), Some(pass)) => Socks5Proxy::with_auth(&proxy_host, proxy_port, user, pass),
        _ => Socks5Proxy::new(&proxy_host, proxy_port),
    };
    println!("Using SOCKS5 proxy {proxy}");

    // Build configuration with proxy
    let config = MailboxConfig::builder()
        .proxy(proxy)
        // Increase timeouts for proxy connections
        .connect_timeout(Duration::from_secs(60))
        .request_timeout(Duration::from_secs(90))
        .build()?;

    let mut guard = MailboxSession::new(config)?.into_guard();
    guard.try_connect().await?;

    println!("Connected via proxy!");
    println!("Address: {}", guard.address().unwrap_or_default());

    println!("\nWaiting for a confirmation link...");
    let options = WaitOptions::new(Duration::from_secs(120), Duration::from_secs(5));
    match guard.wait_for_link(Some("confirm"), &options).await {
        Some((message, link)) => println!("{}: {link}", message.subject()),
        None => println!("No confirmation link arrived"),
    }

    println!("\nDisconnecting.");
    Ok(())
}
