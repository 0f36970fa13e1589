//! Example: Offline extraction from a message body.
//!
//! No network access needed: builds a message by hand and runs every
//! extraction over it, printing the summary as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example extract_info
//! ```

use std::borrow::Cow;
use tempmail_sync::matcher::{ClosureMatcher, RegexMatcher};
use tempmail_sync::{Extractor, Message, TempMail};

const HTML: &str = r#"
<html>
  <head><style>.brand { color: #2024ff }</style></head>
  <body>
    <p>Welcome to Example!</p>
    <p>Your verification code is <strong>803114</strong>.</p>
    <p><a href="https://example.com/account/verify?token=f00dfeed">Verify email</a></p>
    <p><a href="https://example.com/help">Help center</a></p>
    <p>&copy; 2025 Example Inc. Order ref: ORD-55710</p>
  </body>
</html>
"#;

fn main() {
    let message = Message::new("demo-1")
        .with_subject("Verify your Example account")
        .with_sender("no-reply@example.com")
        .with_html(HTML);

    println!("Code:  {:?}", TempMail::extract_code(&message, None));
    println!("Link:  {:?}", TempMail::extract_link(&message, Some("verify")));

    // A custom pattern replaces the built-in ones.
    println!(
        "Order: {:?}",
        TempMail::extract_code(&message, Some(r"ord-(\d+)"))
    );

    // Any matcher works too.
    let extractor = Extractor::default();
    let token = RegexMatcher::new(r"token=([0-9a-f]+)").expect("valid regex");
    let first_line = ClosureMatcher::new(
        |text| text.split(". ").next().map(|s| Cow::Owned(s.trim().to_string())),
        "first sentence",
    );
    println!("Token: {:?}", extractor.extract_code_with(&message, &token));
    println!("First: {:?}", extractor.extract_code_with(&message, &first_line));

    let info = TempMail::extract_info(&message);
    match serde_json::to_string_pretty(&info) {
        Ok(json) => println!("\nSummary:\n{json}"),
        Err(e) => eprintln!("Failed to serialize summary: {e}"),
    }
}
