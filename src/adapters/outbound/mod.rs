mod dashmap_lookup_cache;
mod http_country_resolver;

pub use dashmap_lookup_cache::DashMapLookupCache;
pub use http_country_resolver::{HttpCountryResolver, ResponseFormat};
