//! Random mailbox address generation.
//!
//! A generated address is `local@domain`: the local part is 6 to 10 lowercase
//! ASCII letters and the domain is drawn uniformly from a domain list.
//!
//! # Example
//!
//! ```
//! use tempmail_sync::address::{generate_address, DEFAULT_DOMAINS};
//!
//! let address = generate_address(DEFAULT_DOMAINS);
//! let (local, domain) = address.split_once('@').unwrap();
//! assert!((6..=10).contains(&local.len()));
//! assert!(DEFAULT_DOMAINS.contains(&domain));
//! ```

use rand::seq::IndexedRandom;
use rand::Rng;
use std::ops::RangeInclusive;

/// Disposable domains served by the mailbox service.
pub const DEFAULT_DOMAINS: &[&str] = &["qabq.com", "nqmo.com", "end.tw", "uuf.me", "6n9.net"];

/// Bounds of the local-part length.
pub const LOCAL_PART_LEN: RangeInclusive<usize> = 6..=10;

/// Generates addresses over a fixed, non-empty domain list.
///
/// Holds no state besides the domains; every call draws from the RNG it is given.
#[derive(Debug, Clone)]
pub struct AddressGenerator {
    domains: Vec<String>,
}

impl AddressGenerator {
    /// Creates a generator over `domains`.
    ///
    /// # Panics
    ///
    /// Panics if `domains` is empty.
    #[must_use]
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let domains: Vec<String> = domains.into_iter().map(Into::into).collect();
        assert!(!domains.is_empty(), "domain list must not be empty");
        Self { domains }
    }

    /// Returns the domains this generator draws from.
    #[must_use]
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Generates an address using the thread-local RNG.
    #[must_use]
    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::rng())
    }

    /// Generates an address drawing from `rng`.
    pub fn generate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let len = rng.random_range(LOCAL_PART_LEN);
        let local: String = (0..len)
            .map(|_| char::from(rng.random_range(b'a'..=b'z')))
            .collect();

        // Non-empty by construction.
        let domain = self.domains.choose(rng).map_or("", String::as_str);

        format!("{local}@{domain}")
    }
}

impl Default for AddressGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAINS.iter().copied())
    }
}

/// Generates a random address over `domains`.
///
/// # Panics
///
/// Panics if `domains` is empty.
#[must_use]
pub fn generate_address<S: AsRef<str>>(domains: &[S]) -> String {
    AddressGenerator::new(domains.iter().map(AsRef::as_ref)).generate()
}
