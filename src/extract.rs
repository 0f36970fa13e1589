//! Verification code and link extraction.
//!
//! The [`Extractor`] runs a layered heuristic over a message:
//!
//! 1. The HTML body (script and style removed, flattened to text) is placed in
//!    front of the plain-text body to form the search text.
//! 2. Code patterns are tried in priority order. Narrow numeric shapes come
//!    first so that a 6-digit OTP wins over an unrelated alphanumeric word.
//! 3. Every candidate must pass [`ExtractionRules::is_valid_code`], which drops
//!    years, trivial digit runs and implausible lengths.
//! 4. Links come from HTML anchors first and from URL-shaped text second.
//!
//! All tables live in [`ExtractionRules`], so callers can substitute their own.
//!
//! # Example
//!
//! ```
//! use tempmail_sync::{Extractor, Message};
//!
//! let message = Message::new("1").with_html("<p>Your code: <b>482913</b></p>");
//! let extractor = Extractor::default();
//! assert_eq!(extractor.extract_code(&message, None).as_deref(), Some("482913"));
//! ```

use crate::error::Error;
use crate::html::HtmlView;
use crate::matcher::{Matcher, RegexMatcher};
use crate::message::Message;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Built-in code patterns in priority order: `(name, pattern)`.
pub const DEFAULT_CODE_PATTERNS: &[(&str, &str)] = &[
    ("six_digit", r"\b(\d{6})\b"),
    ("four_digit", r"\b(\d{4})\b"),
    ("eight_digit", r"\b(\d{8})\b"),
    ("alphanumeric", r"\b([A-Z0-9]{6,8})\b"),
    (
        "labelled",
        r"(?:code|verification code|verify code|confirmation code|otp|pin)[\s:：]*([A-Z0-9]{4,8})",
    ),
    ("labelled_cjk", r"(?:验证码|確認碼|驗證碼)[\s:：]*([A-Z0-9]{4,8})"),
    ("query_code", r"[?&]code=([A-Z0-9]+)"),
    ("query_token", r"[?&]token=([A-Z0-9]+)"),
];

/// Candidates that look like codes but almost never are.
pub const DEFAULT_FALSE_POSITIVES: &[&str] = &[
    "2020", "2021", "2022", "2023", "2024", "2025", "2026", "1234", "0000", "9999",
];

/// Keywords tried, in order, when looking for the verification link.
pub const DEFAULT_LINK_KEYWORDS: &[&str] =
    &["verify", "confirm", "activate", "validation", "验证", "確認"];

/// URL-shaped tokens in plain text.
pub const DEFAULT_URL_PATTERN: &str = r#"https?://[^\s<>"]+|www\.[^\s<>"]+"#;

static SHARED: LazyLock<Extractor> = LazyLock::new(Extractor::default);

/// A named, case-insensitive code pattern. The first capture group is the code.
#[derive(Debug, Clone)]
pub struct CodePattern {
    name: String,
    regex: Regex,
}

impl CodePattern {
    /// Compiles `pattern` case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            regex: RegexBuilder::new(pattern).case_insensitive(true).build()?,
        })
    }

    /// Pattern name, used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn candidates<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// Immutable tables driving extraction.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    /// Code patterns in priority order.
    pub code_patterns: Vec<CodePattern>,
    /// Exact candidates that are never codes.
    pub false_positives: HashSet<String>,
    /// Accepted code lengths, in characters.
    pub code_length: RangeInclusive<usize>,
    /// Keywords tried in order for the verification link.
    pub link_keywords: Vec<String>,
    /// Pattern for URLs in plain text.
    pub url_pattern: Regex,
}

impl ExtractionRules {
    /// Returns `true` if `code` is plausible as a verification code.
    ///
    /// ```
    /// use tempmail_sync::ExtractionRules;
    ///
    /// let rules = ExtractionRules::default();
    /// assert!(rules.is_valid_code("482913"));
    /// assert!(!rules.is_valid_code("2024"));
    /// assert!(!rules.is_valid_code("123"));
    /// ```
    #[must_use]
    pub fn is_valid_code(&self, code: &str) -> bool {
        !self.false_positives.contains(code) && self.code_length.contains(&code.chars().count())
    }
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            code_patterns: DEFAULT_CODE_PATTERNS
                .iter()
                .map(|(name, pattern)| CodePattern::new(*name, pattern).expect("valid regex"))
                .collect(),
            false_positives: DEFAULT_FALSE_POSITIVES
                .iter()
                .map(ToString::to_string)
                .collect(),
            code_length: 4..=8,
            link_keywords: DEFAULT_LINK_KEYWORDS
                .iter()
                .map(ToString::to_string)
                .collect(),
            url_pattern: Regex::new(DEFAULT_URL_PATTERN).expect("valid regex"),
        }
    }
}

/// Everything extraction can tell about one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionSummary {
    /// Message subject.
    pub subject: String,
    /// Message sender.
    pub sender: String,
    /// Every distinct valid candidate, first-seen order.
    pub codes: Vec<String>,
    /// The code [`Extractor::extract_code`] picks.
    pub primary_code: Option<String>,
    /// Distinct absolute HTTP(S) anchor targets of the HTML body, first-seen order.
    pub links: Vec<String>,
    /// First link matching a verification keyword.
    pub verification_link: Option<String>,
}

/// Stateless extraction over [`ExtractionRules`].
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    rules: ExtractionRules,
}

/// A message with its HTML parsed at most once.
struct Prepared<'m> {
    message: &'m Message,
    html: Option<HtmlView>,
}

impl<'m> Prepared<'m> {
    fn new(message: &'m Message) -> Self {
        Self {
            message,
            html: message.body_html().map(HtmlView::parse),
        }
    }

    fn search_text(&self) -> String {
        match &self.html {
            Some(html) => format!("{}\n{}", html.text, self.message.body_text()),
            None => self.message.body_text().to_string(),
        }
    }
}

impl Extractor {
    /// Creates an extractor over custom rules.
    #[must_use]
    pub fn new(rules: ExtractionRules) -> Self {
        Self { rules }
    }

    /// Returns a shared extractor over the default rules.
    #[must_use]
    pub fn shared() -> &'static Extractor {
        &SHARED
    }

    /// Returns the rules in use.
    #[must_use]
    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    /// Returns `true` if `code` passes validation.
    #[must_use]
    pub fn is_valid_code(&self, code: &str) -> bool {
        self.rules.is_valid_code(code)
    }

    /// Builds the unified text that code patterns run over.
    ///
    /// Visible HTML text comes first, then the plain-text body.
    #[must_use]
    pub fn search_text(&self, message: &Message) -> String {
        Prepared::new(message).search_text()
    }

    /// Extracts the most likely verification code.
    ///
    /// With `pattern`, only that pattern is applied (case-insensitively) and
    /// its first capture group is returned without validation. An invalid
    /// pattern yields `None`.
    #[must_use]
    pub fn extract_code(&self, message: &Message, pattern: Option<&str>) -> Option<String> {
        self.try_extract_code(message, pattern).unwrap_or_else(|e| {
            warn!(error = %e, category = %e.category(), "Invalid custom code pattern");
            None
        })
    }

    /// Like [`extract_code`](Self::extract_code), but reports a custom
    /// pattern that fails to compile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if `pattern` is not a valid regex.
    pub fn try_extract_code(
        &self,
        message: &Message,
        pattern: Option<&str>,
    ) -> crate::Result<Option<String>> {
        match pattern {
            Some(pattern) => {
                let matcher = RegexMatcher::case_insensitive(pattern).map_err(|source| {
                    Error::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?;
                Ok(self.extract_code_with(message, &matcher))
            }
            None => Ok(self.primary_code(&Prepared::new(message).search_text())),
        }
    }

    /// Extracts a code with a caller-supplied matcher instead of the built-in patterns.
    #[must_use]
    pub fn extract_code_with(&self, message: &Message, matcher: &dyn Matcher) -> Option<String> {
        let text = self.search_text(message);
        let found = matcher.find_match(&text).map(std::borrow::Cow::into_owned);
        debug!(
            message_id = %message.id(),
            matcher = %matcher.description(),
            found = found.is_some(),
            "Applied custom matcher"
        );
        found
    }

    /// Extracts every distinct valid candidate from every pattern, first-seen order.
    #[must_use]
    pub fn extract_all_codes(&self, message: &Message) -> Vec<String> {
        self.all_codes(&Prepared::new(message).search_text())
    }

    /// Extracts a confirmation link, optionally containing `keyword`.
    ///
    /// HTML anchors are checked first, matching `keyword` against the href or
    /// the anchor text. Without HTML or a qualifying anchor, URL-shaped tokens
    /// of the plain-text body are scanned, matching `keyword` against the URL.
    #[must_use]
    pub fn extract_link(&self, message: &Message, keyword: Option<&str>) -> Option<String> {
        self.link(&Prepared::new(message), keyword)
    }

    /// Runs every extraction over the message.
    #[must_use]
    pub fn extract_info(&self, message: &Message) -> ExtractionSummary {
        let prepared = Prepared::new(message);
        let text = prepared.search_text();

        let mut seen = HashSet::new();
        let links = prepared
            .html
            .iter()
            .flat_map(|html| &html.anchors)
            .map(|anchor| anchor.href.as_str())
            .filter(|href| is_absolute_http(href) && seen.insert(*href))
            .map(ToString::to_string)
            .collect();

        let verification_link = self
            .rules
            .link_keywords
            .iter()
            .find_map(|keyword| self.link(&prepared, Some(keyword)));

        ExtractionSummary {
            subject: message.subject().to_string(),
            sender: message.sender().to_string(),
            codes: self.all_codes(&text),
            primary_code: self.primary_code(&text),
            links,
            verification_link,
        }
    }

    fn primary_code(&self, text: &str) -> Option<String> {
        self.rules.code_patterns.iter().find_map(|pattern| {
            let code = pattern
                .candidates(text)
                .find(|candidate| self.rules.is_valid_code(candidate))?;
            debug!(pattern = pattern.name(), "Code pattern matched");
            Some(code.to_string())
        })
    }

    fn all_codes(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut codes = Vec::new();

        for pattern in &self.rules.code_patterns {
            for candidate in pattern.candidates(text) {
                if self.rules.is_valid_code(candidate) && seen.insert(candidate) {
                    codes.push(candidate.to_string());
                }
            }
        }

        codes
    }

    fn link(&self, prepared: &Prepared<'_>, keyword: Option<&str>) -> Option<String> {
        let keyword = keyword
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase);
        let contains = |haystack: &str, needle: &str| haystack.to_lowercase().contains(needle);

        if let Some(html) = &prepared.html {
            let hit = html.anchors.iter().find(|anchor| match &keyword {
                Some(k) => contains(&anchor.href, k.as_str()) || contains(&anchor.text, k.as_str()),
                None => is_absolute_http(&anchor.href),
            });
            if let Some(anchor) = hit {
                return Some(anchor.href.clone());
            }
        }

        self.rules
            .url_pattern
            .find_iter(prepared.message.body_text())
            .map(|m| m.as_str())
            .find(|url| keyword.as_deref().map_or(true, |k| contains(url, k)))
            .map(ToString::to_string)
    }
}

fn is_absolute_http(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}
