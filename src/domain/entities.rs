//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the geoblock domain.
//! They have no external dependencies and contain only business logic.

use crate::domain::ports::ResolutionError;
use crate::domain::value_objects::CountryCode;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

/// Outcome of one country lookup for an IP.
///
/// Cache entries hold these behind an `Arc` and are replaced wholesale,
/// never mutated in place.
#[derive(Debug, Clone)]
pub struct LookupResult {
    /// Address that was looked up
    pub ip: IpAddr,
    /// Resolved country, absent when the lookup failed
    pub country: Option<CountryCode>,
    /// When the lookup completed
    pub fetched_at: Instant,
    /// Failure, if any
    pub error: Option<ResolutionError>,
}

impl LookupResult {
    pub fn resolved(ip: IpAddr, country: CountryCode) -> Self {
        Self {
            ip,
            country: Some(country),
            fetched_at: Instant::now(),
            error: None,
        }
    }

    pub fn failed(ip: IpAddr, error: ResolutionError) -> Self {
        Self {
            ip,
            country: None,
            fetched_at: Instant::now(),
            error: Some(error),
        }
    }

    /// True once `ttl` has elapsed since the lookup completed.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }

    /// Back to the resolver's contract: a country or the error.
    pub fn outcome(&self) -> Result<CountryCode, ResolutionError> {
        match (&self.country, &self.error) {
            (Some(country), _) => Ok(country.clone()),
            (None, Some(err)) => Err(err.clone()),
            (None, None) => Err(ResolutionError::MalformedResponse(
                "lookup produced no country".to_string(),
            )),
        }
    }
}

/// Transport-independent view of the request metadata that identifies
/// the client.
///
/// Built by the inbound adapter; consumed by the client address resolver.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    /// Every value of the forwarding header, one per header line, in order
    pub forwarded_for: Vec<String>,
    /// Peer address of the connection, when the host framework exposes it
    pub remote_addr: Option<SocketAddr>,
}

impl RequestMeta {
    pub fn new(forwarded_for: Vec<String>, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            forwarded_for,
            remote_addr,
        }
    }
}
