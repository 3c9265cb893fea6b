//! HTTP request metrics.
//!
//! Every routed request is counted and timed, labelled by its route
//! template rather than the raw URI so path parameters do not explode the
//! label space.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    histogram_opts, Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::state::GatewayState;

/// Paths that are served but not recorded.
const UNTRACKED_PATHS: [&str; 2] = ["/metrics", "/favicon.ico"];

/// Prometheus collectors for the gateway.
pub struct GatewayMetrics {
    registry: Registry,
    requests: IntCounterVec,
    duration: HistogramVec,
}

impl GatewayMetrics {
    /// Create and register the collectors in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector cannot be created or registered.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests handled"),
            &["path", "method", "status"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        let duration = HistogramVec::new(
            histogram_opts!(
                "http_request_duration_seconds",
                "HTTP request latency in seconds"
            ),
            &["path", "method"],
        )?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            requests,
            duration,
        })
    }

    /// Record one finished request.
    pub fn observe(&self, path: &str, method: &str, status: u16, seconds: f64) {
        self.requests
            .with_label_values(&[path, method, &status.to_string()])
            .inc();
        self.duration
            .with_label_values(&[path, method])
            .observe(seconds);
    }

    /// Render every collector in the Prometheus text format.
    ///
    /// Returns the body and its content type.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> prometheus::Result<(String, String)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;

        let body = String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(e.to_string()))?;
        Ok((body, encoder.format_type().to_string()))
    }
}

/// Middleware that records request counts and latencies.
pub async fn track_metrics(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(
            || request.uri().path().to_string(),
            |p| p.as_str().to_string(),
        );

    if UNTRACKED_PATHS.contains(&path.as_str()) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    state.metrics.observe(
        &path,
        &method,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_requests_are_encoded() {
        let metrics = GatewayMetrics::new().unwrap();
        metrics.observe("/build", "POST", 200, 0.01);
        metrics.observe("/build", "POST", 200, 0.02);
        metrics.observe("/build", "POST", 401, 0.001);

        let (body, content_type) = metrics.encode().unwrap();

        assert!(content_type.starts_with("text/plain"));
        assert!(
            body.contains(r#"http_requests_total{method="POST",path="/build",status="200"} 2"#)
        );
        assert!(
            body.contains(r#"http_requests_total{method="POST",path="/build",status="401"} 1"#)
        );
        assert!(body.contains("http_request_duration_seconds_bucket"));
    }

    #[test]
    fn instances_do_not_share_registries() {
        let first = GatewayMetrics::new().unwrap();
        let second = GatewayMetrics::new().unwrap();
        first.observe("/health", "GET", 200, 0.0);

        let (body, _) = second.encode().unwrap();
        assert!(!body.contains("/health"));
    }
}
