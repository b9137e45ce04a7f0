//! Country Resolver Port
//!
//! Defines the interface for resolving a public IP address to a country code.

use crate::domain::value_objects::CountryCode;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Why a country lookup failed.
///
/// Every variant leads to a Deny verdict. `Clone` so that callers waiting
/// on a shared in-flight lookup all receive the same failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("lookup service unreachable: {0}")]
    Unreachable(String),
    #[error("malformed lookup response: {0}")]
    MalformedResponse(String),
}

/// Resolver for IP address to country code.
///
/// This is an outbound port that abstracts the geolocation service.
/// Implementations must be callable from many requests in parallel and
/// must bound how long a single call can take.
#[async_trait]
pub trait CountryResolver: Send + Sync {
    /// Resolve a public IP address to its country.
    async fn resolve(&self, ip: IpAddr) -> Result<CountryCode, ResolutionError>;
}
