mod country_resolver;
mod lookup_cache;

pub use country_resolver::{CountryResolver, ResolutionError};
pub use lookup_cache::LookupCache;
