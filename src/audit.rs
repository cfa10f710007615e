//! Fire-and-forget security event logging
//!
//! The security gate emits audit events (rate-limit violations, CSRF
//! rejections, auth failures) for later analysis. Delivery must never affect
//! request latency or success, so events flow through an unbounded channel
//! consumed by a background task. Delivery failures are counted and dropped.

use crate::config::AuditConfig;
use crate::metrics::Metrics;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::mpsc;

/// A single security event destined for the external audit store
#[derive(Debug, Clone, Serialize)]
pub struct SecurityEvent {
    pub event_type: String,
    pub metadata: serde_json::Value,
    pub timestamp: String,
}

impl SecurityEvent {
    pub fn new(event_type: &str, metadata: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            metadata,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Non-blocking emitter for security events
///
/// Cloneable handle; `emit` never blocks and never fails the caller. When no
/// audit sink is configured, events are traced at debug level and dropped.
#[derive(Clone)]
pub struct AuditLogger {
    sender: Option<mpsc::UnboundedSender<SecurityEvent>>,
    metrics: Metrics,
}

impl AuditLogger {
    /// Create a logger and spawn its delivery task when a sink is configured
    ///
    /// The service key is read from the environment variable named in the
    /// config; a missing key disables delivery rather than failing startup.
    pub fn new(config: Option<&AuditConfig>, metrics: Metrics) -> Self {
        let sender = config.and_then(|audit| {
            let service_key = match std::env::var(&audit.service_key_env) {
                Ok(key) if !key.trim().is_empty() => key,
                _ => {
                    tracing::warn!(
                        env_var = %audit.service_key_env,
                        "Audit sink configured but service key missing - audit delivery disabled"
                    );
                    return None;
                }
            };

            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(deliver_events(
                rx,
                audit.rest_url.clone(),
                service_key,
                metrics.clone(),
            ));
            Some(tx)
        });

        Self { sender, metrics }
    }

    /// Create a logger that drops every event (tests, no-sink deployments)
    pub fn disabled(metrics: Metrics) -> Self {
        Self {
            sender: None,
            metrics,
        }
    }

    /// Emit an event; never blocks, never errors
    pub fn emit(&self, event_type: &str, metadata: serde_json::Value) {
        let event = SecurityEvent::new(event_type, metadata);

        match &self.sender {
            Some(sender) => {
                // Send only fails when the delivery task has exited
                if sender.send(event).is_err() {
                    self.metrics.record_audit_dropped();
                    tracing::warn!(
                        event_type = event_type,
                        "Audit delivery task gone, event dropped"
                    );
                }
            }
            None => {
                self.metrics.record_audit_dropped();
                tracing::debug!(
                    event_type = event_type,
                    "No audit sink configured, event dropped"
                );
            }
        }
    }
}

/// Background delivery loop: POST each event to the external store
///
/// Runs until the sending side is dropped. A failed POST is logged and the
/// event discarded - audit logging is best-effort by design.
async fn deliver_events(
    mut rx: mpsc::UnboundedReceiver<SecurityEvent>,
    rest_url: String,
    service_key: String,
    metrics: Metrics,
) {
    let client = reqwest::Client::new();
    let endpoint = format!("{}/rest/v1/security_events", rest_url.trim_end_matches('/'));

    while let Some(event) = rx.recv().await {
        let result = client
            .post(&endpoint)
            .header("apikey", &service_key)
            .header("Authorization", format!("Bearer {}", service_key))
            .json(&event)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(event_type = %event.event_type, "Audit event delivered");
            }
            Ok(response) => {
                metrics.record_audit_dropped();
                tracing::warn!(
                    event_type = %event.event_type,
                    status = %response.status(),
                    "Audit store rejected event, dropping"
                );
            }
            Err(e) => {
                metrics.record_audit_dropped();
                tracing::warn!(
                    event_type = %event.event_type,
                    error = %e,
                    "Audit event delivery failed, dropping"
                );
            }
        }
    }
}
