//! GeoBlock Service - Main application use case
//!
//! Orchestrates the per-request decision: picking the client address,
//! classifying it, resolving its country and applying the policy.
//! This is the primary interface for the inbound adapter.

use crate::adapters::outbound::{DashMapLookupCache, HttpCountryResolver};
use crate::config::{ConfigError, ValidatedConfig};
use crate::domain::entities::{LookupResult, RequestMeta};
use crate::domain::ports::{CountryResolver, LookupCache, ResolutionError};
use crate::domain::services::{AddressClassifier, ClientAddressResolver, Policy, PolicyEngine};
use crate::domain::value_objects::{AddressClass, CountryCode, Decision, VerdictReason};
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

type SharedLookup = Arc<OnceCell<LookupResult>>;

/// GeoBlock service - main application use case.
///
/// Holds no per-request state. The only state shared across requests is
/// the optional lookup cache and the map of lookups currently in flight.
pub struct GeoBlockService {
    resolver: Arc<dyn CountryResolver>,
    cache: Option<Arc<dyn LookupCache>>,
    cache_ttl: Duration,
    policy: Policy,
    in_flight: DashMap<IpAddr, SharedLookup>,
}

impl GeoBlockService {
    /// Create a new service without a cache.
    pub fn new(resolver: Arc<dyn CountryResolver>, policy: Policy) -> Self {
        Self {
            resolver,
            cache: None,
            cache_ttl: Duration::ZERO,
            policy,
            in_flight: DashMap::new(),
        }
    }

    /// Memoize successful lookups in `cache` for `ttl`.
    pub fn with_cache(mut self, cache: Arc<dyn LookupCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// Wire the HTTP resolver and, when a TTL is configured, the DashMap cache.
    pub fn from_config(config: &ValidatedConfig) -> Result<Self, ConfigError> {
        let resolver = Arc::new(HttpCountryResolver::from_config(config)?);
        let service = Self::new(resolver, config.policy().clone());

        let Some(ttl) = config.cache_ttl() else {
            tracing::info!("lookup cache disabled, every public address is looked up");
            return Ok(service);
        };

        let mut cache = DashMapLookupCache::new(config.cache_size());
        // GC needs a runtime; without one, expiry still happens on read.
        if tokio::runtime::Handle::try_current().is_ok() {
            cache.start_gc(ttl.max(Duration::from_secs(1)));
        }
        tracing::info!(
            "lookup cache enabled ttl={:?} size={}",
            ttl,
            cache.capacity()
        );
        Ok(service.with_cache(Arc::new(cache), ttl))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Decide a request.
    ///
    /// Every candidate address must be allowed; the first denial wins.
    /// A request with no candidate at all is denied.
    pub async fn evaluate(&self, meta: &RequestMeta) -> Decision {
        let mut last = None;

        for candidate in ClientAddressResolver::candidates(meta) {
            let decision = self.check_address(&candidate).await;
            if !decision.is_allowed() {
                return decision;
            }
            last = Some(decision);
        }

        last.unwrap_or_else(|| {
            tracing::info!(reason = %VerdictReason::InvalidAddress, "no client address on request");
            Decision::deny(VerdictReason::InvalidAddress)
        })
    }

    /// Decide a single raw client address.
    pub async fn check_address(&self, raw: &str) -> Decision {
        let class = AddressClassifier::classify(raw);

        let lookup = match class {
            AddressClass::Public(ip) => Some(self.lookup_country(ip).await),
            AddressClass::Invalid | AddressClass::Private(_) => None,
        };

        let decision = PolicyEngine::decide(&class, lookup.as_ref(), &self.policy);

        let country = match &lookup {
            Some(Ok(c)) => c.as_str(),
            _ => "-",
        };
        if decision.is_allowed() {
            tracing::debug!(client_ip = raw, country, reason = %decision.reason, "request allowed");
        } else {
            tracing::info!(client_ip = raw, country, reason = %decision.reason, "request denied");
        }

        decision
    }

    /// Resolve the country for a public IP, through the cache when enabled.
    ///
    /// Concurrent calls for the same IP share one outbound lookup. If the
    /// caller driving it is dropped, a waiting caller takes it over.
    pub async fn lookup_country(&self, ip: IpAddr) -> Result<CountryCode, ResolutionError> {
        if let Some(country) = self.cache.as_ref().and_then(|c| c.get(&ip)) {
            return Ok(country);
        }

        let cell = self
            .in_flight
            .entry(ip)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            ip,
            cell: &cell,
        };

        let result = cell
            .get_or_init(|| async {
                match self.resolver.resolve(ip).await {
                    Ok(country) => {
                        if let Some(cache) = &self.cache {
                            cache.put(ip, country.clone(), self.cache_ttl);
                        }
                        LookupResult::resolved(ip, country)
                    }
                    Err(e) => {
                        tracing::warn!(client_ip = %ip, error = %e, "country lookup failed");
                        LookupResult::failed(ip, e)
                    }
                }
            })
            .await
            .outcome();
        result
    }

    /// Number of distinct IPs with a lookup currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

/// Clears the in-flight slot when the lookup finishes or its caller is dropped.
struct InFlightGuard<'a> {
    in_flight: &'a DashMap<IpAddr, SharedLookup>,
    ip: IpAddr,
    cell: &'a SharedLookup,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(&self.ip, |_, current| Arc::ptr_eq(current, self.cell));
    }
}
