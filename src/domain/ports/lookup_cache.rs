//! Lookup Cache Port
//!
//! Defines the interface for memoizing IP to country lookups.

use crate::domain::entities::LookupResult;
use crate::domain::value_objects::CountryCode;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Bounded, time-limited memo of successful lookups.
///
/// Expired entries must read as absent. Implementations must stay bounded
/// in size and be safe under concurrent access.
pub trait LookupCache: Send + Sync {
    /// Get the cached country for an IP, if present and not expired.
    fn get(&self, ip: &IpAddr) -> Option<CountryCode>;

    /// Store a country for an IP, replacing any previous entry.
    fn put(&self, ip: IpAddr, country: CountryCode, ttl: Duration);

    /// Full cached entry, for diagnostics.
    fn entry(&self, ip: &IpAddr) -> Option<Arc<LookupResult>>;

    /// Number of entries currently held (expired ones included until GC).
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
