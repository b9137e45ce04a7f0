//! GeoBlock Middleware
//!
//! Tower layer that lets a request through to the wrapped service only when
//! its client address passes the country policy. Denied requests get an
//! empty 403 and never reach the inner service.
//!
//! # Usage
//!
//! ```ignore
//! let layer = GeoBlockLayer::new(&config)?;
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(layer);
//!
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```
//!
//! The remote-address fallback needs `ConnectInfo<SocketAddr>`, hence
//! `into_make_service_with_connect_info` above.

use crate::application::GeoBlockService;
use crate::config::{Config, ConfigError};
use crate::domain::entities::RequestMeta;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Layer for applying the geoblock middleware.
#[derive(Clone)]
pub struct GeoBlockLayer {
    service: Arc<GeoBlockService>,
    client_ip_header: HeaderName,
}

impl GeoBlockLayer {
    /// Validate `config` and build the layer.
    ///
    /// Fails without producing a layer if the configuration is invalid.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let validated = config.validate()?;
        let service = GeoBlockService::from_config(&validated)?;

        tracing::info!(
            "geoblock enabled countries={} allow_local_requests={} header={}",
            validated.policy().allowed_countries.len(),
            validated.policy().allow_local_requests,
            validated.client_ip_header()
        );

        Ok(Self::with_service(
            Arc::new(service),
            validated.client_ip_header().clone(),
        ))
    }

    /// Build the layer around an existing service.
    pub fn with_service(service: Arc<GeoBlockService>, client_ip_header: HeaderName) -> Self {
        Self {
            service,
            client_ip_header,
        }
    }
}

impl<S> Layer<S> for GeoBlockLayer {
    type Service = GeoBlockMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GeoBlockMiddleware {
            inner,
            service: self.service.clone(),
            client_ip_header: self.client_ip_header.clone(),
        }
    }
}

/// Middleware service that checks the client's country before forwarding.
#[derive(Clone)]
pub struct GeoBlockMiddleware<S> {
    inner: S,
    service: Arc<GeoBlockService>,
    client_ip_header: HeaderName,
}

impl<S> Service<Request<Body>> for GeoBlockMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let meta = request_meta(&req, &self.client_ip_header);
        let service = self.service.clone();

        // Take the service that was polled ready, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let decision = service.evaluate(&meta).await;
            if decision.is_allowed() {
                inner.call(req).await
            } else {
                tracing::debug!(
                    path = %req.uri().path(),
                    reason = %decision.reason,
                    "rejecting request"
                );
                Ok(forbidden())
            }
        })
    }
}

/// Pull the client-identifying metadata off a request.
///
/// Header values that are not valid UTF-8 are kept as empty strings so
/// they classify as invalid rather than vanish.
pub fn request_meta<B>(req: &Request<B>, client_ip_header: &HeaderName) -> RequestMeta {
    let forwarded_for = req
        .headers()
        .get_all(client_ip_header)
        .iter()
        .map(|v| v.to_str().unwrap_or_default().to_string())
        .collect();

    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    RequestMeta::new(forwarded_for, remote_addr)
}

/// Rejection response. Carries no detail about why.
fn forbidden() -> Response {
    StatusCode::FORBIDDEN.into_response()
}
