//! geoblock
//!
//! Country-based access control for HTTP services. A tower layer resolves
//! each request's client address to a country through a remote geolocation
//! API and lets it through only when the country is on the allow-list.
//!
//! The client address is read from a forwarding header (`X-Forwarded-For`
//! by default) when present. That header is trusted as-is, so the layer
//! must sit behind a proxy that sets it.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

// Re-export commonly used types
pub use adapters::inbound::{GeoBlockLayer, GeoBlockMiddleware};
pub use adapters::outbound::{DashMapLookupCache, HttpCountryResolver, ResponseFormat};
pub use application::GeoBlockService;
pub use config::{load_config, Config, ConfigError, ValidatedConfig};
pub use domain::entities::{LookupResult, RequestMeta};
pub use domain::ports::{CountryResolver, LookupCache, ResolutionError};
pub use domain::services::{
    AddressClassifier, AddressError, ClientAddressResolver, Policy, PolicyEngine,
};
pub use domain::value_objects::{AddressClass, CountryCode, Decision, Verdict, VerdictReason};
