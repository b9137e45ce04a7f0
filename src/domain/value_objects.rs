//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Two-letter country code (ISO 3166-1 alpha-2), always stored uppercase.
///
/// Construction normalizes case, so two codes compare equal whenever their
/// letters do regardless of how the source spelled them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse and normalize a country code.
    ///
    /// Surrounding whitespace is ignored. Anything other than exactly two
    /// ASCII letters is rejected.
    ///
    /// # Examples
    /// ```
    /// use geoblock::CountryCode;
    ///
    /// assert_eq!(CountryCode::parse(" ch\n").unwrap().as_str(), "CH");
    /// assert!(CountryCode::parse("CHE").is_none());
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.len() == 2 && trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
            Some(Self(trimmed.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CountryCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid country code: {:?}", value))
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of a raw client address string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    /// Not an IPv4 or IPv6 literal
    Invalid,
    /// Loopback, link-local, or a private/unique-local range
    Private(IpAddr),
    /// Publicly routable; needs a country lookup
    Public(IpAddr),
}

impl AddressClass {
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Self::Invalid => None,
            Self::Private(ip) | Self::Public(ip) => Some(*ip),
        }
    }
}

/// Binary outcome of a policy decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Deny,
}

/// Why a verdict was reached. Observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    LocalAllowed,
    LocalDenied,
    CountryAllowed,
    CountryDenied,
    InvalidAddress,
    LookupFailed,
}

impl VerdictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalAllowed => "local_allowed",
            Self::LocalDenied => "local_denied",
            Self::CountryAllowed => "country_allowed",
            Self::CountryDenied => "country_denied",
            Self::InvalidAddress => "invalid_address",
            Self::LookupFailed => "lookup_failed",
        }
    }
}

impl std::fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verdict together with the reason that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub reason: VerdictReason,
}

impl Decision {
    pub fn allow(reason: VerdictReason) -> Self {
        Self {
            verdict: Verdict::Allow,
            reason,
        }
    }

    pub fn deny(reason: VerdictReason) -> Self {
        Self {
            verdict: Verdict::Deny,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allow
    }
}
