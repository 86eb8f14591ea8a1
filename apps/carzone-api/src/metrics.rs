//! Prometheus request metrics.
//!
//! [`RequestMetricsRecorder`] owns its own registry and is built once at
//! startup, then shared through application state.
//!
//! # Metric Specification
//!
//! | Name                              | Type      | Labels                         |
//! |-----------------------------------|-----------|--------------------------------|
//! | `http_requests_total`             | Counter   | `path`, `method`               |
//! | `http_requests_duration_seconds`  | Histogram | `path`, `method`               |
//! | `http_response_status_total`      | Counter   | `path`, `method`, `status_code`|

use std::future::Future;
use std::time::{Duration, Instant};

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::debug;

/// Status reported when the wrapped operation never produced a response.
const UNFINISHED_STATUS: u16 = 500;

/// Anything that carries the HTTP status actually sent to the client.
pub trait EmittedStatus {
    fn emitted_status(&self) -> u16;
}

impl EmittedStatus for axum::response::Response {
    fn emitted_status(&self) -> u16 {
        self.status().as_u16()
    }
}

/// Prometheus-backed HTTP request recorder.
pub struct RequestMetricsRecorder {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    response_status: IntCounterVec,
}

impl RequestMetricsRecorder {
    /// Create the metrics and register them with a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be created or registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Number of HTTP requests"),
            &["path", "method"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_requests_duration_seconds",
                "Duration of HTTP requests in seconds",
            ),
            &["path", "method"],
        )?;
        registry.register(Box::new(request_duration.clone()))?;

        let response_status = IntCounterVec::new(
            Opts::new("http_response_status_total", "Status codes of HTTP responses"),
            &["path", "method", "status_code"],
        )?;
        registry.register(Box::new(response_status.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            response_status,
        })
    }

    /// Record one finished request. Recording failures are dropped.
    pub fn record(&self, path: &str, method: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();

        let outcome = self
            .requests_total
            .get_metric_with_label_values(&[path, method])
            .map(|counter| counter.inc())
            .and_then(|_| {
                self.request_duration
                    .get_metric_with_label_values(&[path, method])
                    .map(|histogram| histogram.observe(elapsed.as_secs_f64()))
            })
            .and_then(|_| {
                self.response_status
                    .get_metric_with_label_values(&[path, method, status.as_str()])
                    .map(|counter| counter.inc())
            });

        if let Err(e) = outcome {
            debug!(error = %e, path, method, "Dropping metrics sample");
        }
    }

    /// Run `operation` and record it with the status it emitted.
    ///
    /// The sample is recorded even if `operation` panics or is dropped
    /// before completing; such requests are counted as 500.
    pub async fn observe<F, R>(&self, path: &str, method: &str, operation: F) -> R
    where
        F: Future<Output = R>,
        R: EmittedStatus,
    {
        let mut guard = Observation {
            recorder: self,
            path,
            method,
            started: Instant::now(),
            status: None,
        };

        let response = operation.await;
        guard.status = Some(response.emitted_status());
        response
    }

    /// Render every metric in the text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Current `http_requests_total` value for a label pair.
    pub fn request_count(&self, path: &str, method: &str) -> u64 {
        self.requests_total
            .get_metric_with_label_values(&[path, method])
            .map(|counter| counter.get())
            .unwrap_or(0)
    }

    /// Current `http_response_status_total` value for a label triple.
    pub fn status_count(&self, path: &str, method: &str, status: u16) -> u64 {
        let status = status.to_string();
        self.response_status
            .get_metric_with_label_values(&[path, method, status.as_str()])
            .map(|counter| counter.get())
            .unwrap_or(0)
    }
}

/// Records one sample when dropped.
struct Observation<'a> {
    recorder: &'a RequestMetricsRecorder,
    path: &'a str,
    method: &'a str,
    started: Instant,
    status: Option<u16>,
}

impl Drop for Observation<'_> {
    fn drop(&mut self) {
        let status = self.status.unwrap_or(UNFINISHED_STATUS);
        self.recorder
            .record(self.path, self.method, status, self.started.elapsed());
    }
}
