use crate::domain::services::Policy;
use crate::domain::value_objects::CountryCode;
use axum::http::HeaderName;
use serde::Deserialize;
use std::time::Duration;

/// Placeholder substituted with the client IP in the lookup URL template.
pub const IP_PLACEHOLDER: &str = "{ip}";

pub const DEFAULT_API_TIMEOUT_MS: u64 = 750;
pub const DEFAULT_CACHE_SIZE: usize = 10_000;
pub const DEFAULT_CLIENT_IP_HEADER: &str = "X-Forwarded-For";

/// Raw middleware options, as a host supplies them.
///
/// Keys deserialize in camelCase (`api`, `countries`, `allowLocalRequests`).
/// Nothing is checked until [`Config::validate`].
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    // Policy
    pub api: String,
    pub countries: Vec<String>,
    pub allow_local_requests: bool,

    // Lookup service
    pub api_timeout_ms: u64,
    pub api_response_field: Option<String>,

    // Lookup cache; no TTL or a zero TTL means no cache
    pub cache_ttl_secs: Option<u64>,
    pub cache_size: usize,

    pub client_ip_header: String,

    // Binary only
    pub listen_addr: String,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: String::new(),
            countries: Vec::new(),
            allow_local_requests: false,
            api_timeout_ms: DEFAULT_API_TIMEOUT_MS,
            api_response_field: None,
            cache_ttl_secs: None,
            cache_size: DEFAULT_CACHE_SIZE,
            client_ip_header: DEFAULT_CLIENT_IP_HEADER.to_string(),
            listen_addr: "0.0.0.0:8080".to_string(),
            debug: false,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("api template must be non-empty and contain {{ip}}: {0:?}")]
    InvalidApiTemplate(String),
    #[error("country list must not be empty")]
    EmptyCountryList,
    #[error("invalid country code: {0:?}")]
    InvalidCountryCode(String),
    #[error("api timeout must be greater than zero")]
    InvalidTimeout,
    #[error("cache size must be greater than zero when caching is enabled")]
    InvalidCacheSize,
    #[error("invalid client ip header name: {0:?}")]
    InvalidHeaderName(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// Checked, immutable configuration. Only [`Config::validate`] makes one.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    api_template: String,
    policy: Policy,
    lookup_timeout: Duration,
    response_field: Option<String>,
    cache_ttl: Option<Duration>,
    cache_size: usize,
    client_ip_header: HeaderName,
}

impl ValidatedConfig {
    pub fn api_template(&self) -> &str {
        &self.api_template
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    pub fn response_field(&self) -> Option<&str> {
        self.response_field.as_deref()
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn client_ip_header(&self) -> &HeaderName {
        &self.client_ip_header
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// Country codes are normalized to uppercase and de-duplicated.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let api_template = self.api.trim();
        if api_template.is_empty() || !api_template.contains(IP_PLACEHOLDER) {
            return Err(ConfigError::InvalidApiTemplate(self.api.clone()));
        }

        if self.countries.is_empty() {
            return Err(ConfigError::EmptyCountryList);
        }
        let countries = self
            .countries
            .iter()
            .map(|c| {
                CountryCode::parse(c).ok_or_else(|| ConfigError::InvalidCountryCode(c.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.api_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let cache_ttl = self
            .cache_ttl_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs);
        if cache_ttl.is_some() && self.cache_size == 0 {
            return Err(ConfigError::InvalidCacheSize);
        }

        let client_ip_header = HeaderName::from_bytes(self.client_ip_header.trim().as_bytes())
            .map_err(|_| ConfigError::InvalidHeaderName(self.client_ip_header.clone()))?;

        let response_field = self
            .api_response_field
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        Ok(ValidatedConfig {
            api_template: api_template.to_string(),
            policy: Policy::new(countries, self.allow_local_requests),
            lookup_timeout: Duration::from_millis(self.api_timeout_ms),
            response_field,
            cache_ttl,
            cache_size: self.cache_size,
            client_ip_header,
        })
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Build a [`Config`] from a key lookup (the process environment in
/// [`load_config`]). Unparsable numbers fall back to their defaults.
pub fn load_config_from<F>(var: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let api = var("GEOBLOCK_API").unwrap_or_default();

    let countries = var("GEOBLOCK_COUNTRIES")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let allow_local_requests = var("GEOBLOCK_ALLOW_LOCAL_REQUESTS")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    let api_timeout_ms = var("GEOBLOCK_API_TIMEOUT_MS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.api_timeout_ms);

    let api_response_field = var("GEOBLOCK_API_RESPONSE_FIELD");

    let cache_ttl_secs = var("GEOBLOCK_CACHE_TTL_SECS").and_then(|v| v.parse().ok());

    let cache_size = var("GEOBLOCK_CACHE_SIZE")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.cache_size);

    let client_ip_header = var("GEOBLOCK_CLIENT_IP_HEADER").unwrap_or(defaults.client_ip_header);

    let listen_addr = var("GEOBLOCK_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

    let debug = var("DEBUG").is_some();

    Ok(Config {
        api,
        countries,
        allow_local_requests,
        api_timeout_ms,
        api_response_field,
        cache_ttl_secs,
        cache_size,
        client_ip_header,
        listen_addr,
        debug,
    })
}
