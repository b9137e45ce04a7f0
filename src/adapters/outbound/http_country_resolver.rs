//! HTTP Country Resolver
//!
//! Implements CountryResolver against a remote geolocation API reached
//! through a URL template such as `https://get.geojs.io/v1/ip/country/{ip}`.

use crate::config::{ConfigError, ValidatedConfig, IP_PLACEHOLDER};
use crate::domain::ports::{CountryResolver, ResolutionError};
use crate::domain::value_objects::CountryCode;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// How the country code is carried in the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseFormat {
    /// The whole body is the code, e.g. `CH\n`
    PlainText,
    /// A JSON object; the code sits at this dotted path, e.g. `country.iso_code`
    JsonField(String),
}

/// Geolocation API client.
///
/// Holds one pooled `reqwest::Client` whose timeout bounds every lookup,
/// connect through body. Clones share the pool.
#[derive(Clone)]
pub struct HttpCountryResolver {
    client: reqwest::Client,
    api_template: String,
    format: ResponseFormat,
    timeout: Duration,
}

impl HttpCountryResolver {
    pub fn new(
        api_template: impl Into<String>,
        timeout: Duration,
        format: ResponseFormat,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_template: api_template.into(),
            format,
            timeout,
        })
    }

    pub fn from_config(config: &ValidatedConfig) -> Result<Self, ConfigError> {
        let format = match config.response_field() {
            Some(field) => ResponseFormat::JsonField(field.to_string()),
            None => ResponseFormat::PlainText,
        };
        Self::new(config.api_template(), config.lookup_timeout(), format)
    }

    /// Lookup URL for an IP.
    pub fn lookup_url(&self, ip: IpAddr) -> String {
        self.api_template.replace(IP_PLACEHOLDER, &ip.to_string())
    }

    /// Extract the country code from a response body.
    fn parse_body(&self, body: &str) -> Result<CountryCode, ResolutionError> {
        let raw = match &self.format {
            ResponseFormat::PlainText => body.trim().to_string(),
            ResponseFormat::JsonField(path) => {
                let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
                    ResolutionError::MalformedResponse(format!("invalid json: {}", e))
                })?;
                path.split('.')
                    .try_fold(&value, |v, key| v.get(key))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        let reason = format!("missing string field {:?}", path);
                        ResolutionError::MalformedResponse(reason)
                    })?
            }
        };

        if raw.is_empty() {
            return Err(ResolutionError::MalformedResponse("empty body".to_string()));
        }

        CountryCode::parse(&raw).ok_or_else(|| {
            let shown = truncate(&raw, 32);
            ResolutionError::MalformedResponse(format!("not a country code: {:?}", shown))
        })
    }

    fn map_error(&self, err: reqwest::Error) -> ResolutionError {
        if err.is_timeout() {
            ResolutionError::Timeout(self.timeout)
        } else {
            ResolutionError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl CountryResolver for HttpCountryResolver {
    async fn resolve(&self, ip: IpAddr) -> Result<CountryCode, ResolutionError> {
        let url = self.lookup_url(ip);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        if !response.status().is_success() {
            return Err(ResolutionError::Unreachable(format!(
                "status {}",
                response.status()
            )));
        }

        let body = response.text().await.map_err(|e| self.map_error(e))?;
        let country = self.parse_body(&body)?;

        tracing::debug!(client_ip = %ip, country = %country, "country lookup ok");
        Ok(country)
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
