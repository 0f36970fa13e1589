//! Custom content matching for message bodies.
//!
//! A [`Matcher`] replaces the built-in code patterns when the caller knows
//! exactly what to look for, e.g. a service-specific token format.
//!
//! # Example
//!
//! ```
//! use tempmail_sync::matcher::{Matcher, RegexMatcher};
//!
//! let custom = RegexMatcher::case_insensitive(r"token=([a-f0-9]+)").unwrap();
//! let text = "Click here: https://example.com?TOKEN=ABC123";
//! assert_eq!(custom.find_match(text).as_deref(), Some("ABC123"));
//! ```

use regex::{Regex, RegexBuilder};
use std::borrow::Cow;

/// Trait for matching and extracting content from message text.
///
/// Implement this trait to define custom matching logic.
///
/// # Example
///
/// ```
/// use tempmail_sync::matcher::Matcher;
/// use std::borrow::Cow;
///
/// struct LastLineMatcher;
///
/// impl Matcher for LastLineMatcher {
///     fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
///         text.lines().last().map(Cow::Borrowed)
///     }
///
///     fn description(&self) -> &str {
///         "last line"
///     }
/// }
/// ```
pub trait Matcher: Send + Sync {
    /// Attempts to find and extract matching content from the text.
    ///
    /// Returns `Some(matched_value)` if found, `None` otherwise.
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>>;

    /// Returns a human-readable description of what this matcher looks for.
    ///
    /// Used in logging.
    fn description(&self) -> &str;
}

/// Regex-based matcher that extracts the first capture group.
///
/// A pattern without capture groups yields the whole match.
///
/// ```
/// use tempmail_sync::matcher::{Matcher, RegexMatcher};
///
/// let matcher = RegexMatcher::new(r"code:\s*(\d+)").unwrap();
/// assert_eq!(matcher.find_match("Your code: 42"), Some("42".into()));
/// ```
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    description: String,
}

impl RegexMatcher {
    /// Creates a new case-sensitive regex matcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            description: format!("regex pattern: {pattern}"),
            regex,
        })
    }

    /// Creates a matcher that ignores case, the way custom code patterns are applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn case_insensitive(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            description: format!("regex pattern (case-insensitive): {pattern}"),
            regex,
        })
    }

    /// Creates a new regex matcher with a custom description.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn with_description(
        pattern: &str,
        description: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            description: description.into(),
            regex,
        })
    }
}

impl Matcher for RegexMatcher {
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        let caps = self.regex.captures(text)?;
        let group = if self.regex.captures_len() > 1 { 1 } else { 0 };
        caps.get(group).map(|m| Cow::Borrowed(m.as_str()))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Matcher using a closure for custom matching logic.
///
/// ```
/// use tempmail_sync::matcher::{ClosureMatcher, Matcher};
/// use std::borrow::Cow;
///
/// let matcher = ClosureMatcher::new(
///     |text| {
///         text.lines()
///             .find(|line| line.starts_with("Code:"))
///             .map(|line| Cow::Owned(line.trim_start_matches("Code:").trim().to_string()))
///     },
///     "code line extractor"
/// );
///
/// let text = "Hello\nCode: ABC123\nThanks";
/// assert_eq!(matcher.find_match(text).as_deref(), Some("ABC123"));
/// ```
pub struct ClosureMatcher<F>
where
    F: for<'a> Fn(&'a str) -> Option<Cow<'a, str>> + Send + Sync,
{
    matcher_fn: F,
    description: String,
}

impl<F> ClosureMatcher<F>
where
    F: for<'a> Fn(&'a str) -> Option<Cow<'a, str>> + Send + Sync,
{
    /// Creates a new closure-based matcher.
    #[must_use]
    pub fn new(matcher_fn: F, description: impl Into<String>) -> Self {
        Self {
            matcher_fn,
            description: description.into(),
        }
    }
}

impl<F> Matcher for ClosureMatcher<F>
where
    F: for<'a> Fn(&'a str) -> Option<Cow<'a, str>> + Send + Sync,
{
    fn find_match<'a>(&self, text: &'a str) -> Option<Cow<'a, str>> {
        (self.matcher_fn)(text)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

impl<F> std::fmt::Debug for ClosureMatcher<F>
where
    F: for<'a> Fn(&'a str) -> Option<Cow<'a, str>> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureMatcher")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_matcher() {
        let matcher = RegexMatcher::new(r"code:\s*(\d+)").unwrap();
        assert_eq!(
            matcher.find_match("Your code: 12345").as_deref(),
            Some("12345")
        );
        assert_eq!(matcher.find_match("No code here"), None);
        assert_eq!(matcher.find_match("Your CODE: 12345"), None);
    }

    #[test]
    fn test_case_insensitive_matcher() {
        let matcher = RegexMatcher::case_insensitive(r"pin\s+([a-z0-9]{4})").unwrap();
        assert_eq!(matcher.find_match("Your PIN AB12").as_deref(), Some("AB12"));
    }

    #[test]
    fn test_pattern_without_group_returns_whole_match() {
        let matcher = RegexMatcher::new(r"\d{3}-\d{3}").unwrap();
        assert_eq!(matcher.find_match("call 555-123 now").as_deref(), Some("555-123"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(RegexMatcher::case_insensitive(r"(unclosed").is_err());
    }

    #[test]
    fn test_closure_matcher() {
        let matcher = ClosureMatcher::new(
            |text| {
                text.lines()
                    .find(|line| line.contains("SECRET"))
                    .map(|line| Cow::Owned(line.replace("SECRET:", "").trim().to_string()))
            },
            "secret extractor",
        );

        let text = "Header\nSECRET: my-value\nFooter";
        assert_eq!(matcher.find_match(text).as_deref(), Some("my-value"));
        assert_eq!(matcher.description(), "secret extractor");
    }

    #[test]
    fn test_regex_matcher_returns_borrowed() {
        let matcher = RegexMatcher::new(r"code:\s*(\d+)").unwrap();
        let result = matcher.find_match("Your code: 12345");
        assert!(matches!(result, Some(Cow::Borrowed(_))));
    }
}
