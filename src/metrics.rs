//! Prometheus metrics collection for saargate
//!
//! Tracks generation requests by provider and outcome, fallback servings,
//! rate-limit denials, estimated provider spend, and generation latency.
//! Exposed via the `/metrics` endpoint in Prometheus text format.
//!
//! Recording failures are never propagated to request handlers - callers
//! log and continue (observability must not break requests).

use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Request outcome for type-safe metrics labels
///
/// Prevents cardinality explosion by restricting outcome values to
/// exactly two valid options at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }
}

/// Metrics collector for saargate
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    generation_requests: CounterVec,
    generation_duration: HistogramVec,
    fallback_responses: IntCounter,
    rate_limited: IntCounterVec,
    estimated_cost_usd: CounterVec,
    audit_events_dropped: IntCounter,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 3 providers x 2 outcomes = 6 time series
        let generation_requests = CounterVec::new(
            Opts::new(
                "saargate_generation_requests_total",
                "Provider generation attempts by provider and outcome",
            ),
            &["provider", "outcome"],
        )?;

        let generation_duration = HistogramVec::new(
            HistogramOpts::new(
                "saargate_generation_duration_ms",
                "Provider generation latency in milliseconds",
            )
            .buckets(vec![50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 15000.0, 30000.0]),
            &["provider"],
        )?;

        let fallback_responses = IntCounter::new(
            "saargate_fallback_responses_total",
            "Responses served by the deterministic fallback responder",
        )?;

        // Label values come from the configured rate-limit rule prefixes,
        // which is a small, operator-controlled set.
        let rate_limited = IntCounterVec::new(
            Opts::new(
                "saargate_rate_limited_total",
                "Requests denied by the rate limiter, by route class",
            ),
            &["route_class"],
        )?;

        let estimated_cost_usd = CounterVec::new(
            Opts::new(
                "saargate_estimated_cost_usd_total",
                "Estimated provider spend in USD, from static per-provider unit costs",
            ),
            &["provider"],
        )?;

        let audit_events_dropped = IntCounter::new(
            "saargate_audit_events_dropped_total",
            "Security audit events dropped because delivery failed or no sink is configured",
        )?;

        registry.register(Box::new(generation_requests.clone()))?;
        registry.register(Box::new(generation_duration.clone()))?;
        registry.register(Box::new(fallback_responses.clone()))?;
        registry.register(Box::new(rate_limited.clone()))?;
        registry.register(Box::new(estimated_cost_usd.clone()))?;
        registry.register(Box::new(audit_events_dropped.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            generation_requests,
            generation_duration,
            fallback_responses,
            rate_limited,
            estimated_cost_usd,
            audit_events_dropped,
        })
    }

    /// Record a provider generation attempt
    pub fn record_generation(&self, provider: &str, outcome: Outcome) {
        self.generation_requests
            .with_label_values(&[provider, outcome.as_str()])
            .inc();
    }

    /// Record generation latency for a provider
    pub fn record_generation_duration(&self, provider: &str, duration_ms: f64) {
        self.generation_duration
            .with_label_values(&[provider])
            .observe(duration_ms);
    }

    /// Record a response served by the fallback responder
    pub fn record_fallback(&self) {
        self.fallback_responses.inc();
    }

    /// Record a rate-limit denial for a route class
    pub fn record_rate_limited(&self, route_class: &str) {
        self.rate_limited.with_label_values(&[route_class]).inc();
    }

    /// Record an estimated cost for a provider call
    pub fn record_estimated_cost(&self, provider: &str, cost_usd: f64) {
        if cost_usd.is_finite() && cost_usd >= 0.0 {
            self.estimated_cost_usd
                .with_label_values(&[provider])
                .inc_by(cost_usd);
        }
    }

    /// Record a dropped audit event
    pub fn record_audit_dropped(&self) {
        self.audit_events_dropped.inc();
    }

    /// Number of fallback responses served so far
    pub fn fallback_count(&self) -> u64 {
        self.fallback_responses.get()
    }

    /// Render all metrics in Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
