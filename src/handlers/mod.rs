//! HTTP request handlers for the saargate API

use crate::audit::AuditLogger;
use crate::config::Config;
use crate::error::AppError;
use crate::metrics::Metrics;
use crate::middleware::{MemoryRateLimitStore, SecurityGate};
use crate::providers::ProviderRegistry;
use crate::router::ModelRouter;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use std::sync::Arc;
use std::time::Duration;

pub mod chat;
pub mod embeddings;
pub mod health;
pub mod metrics;

/// JSON body extractor whose rejections use the standard error envelope
///
/// Axum's bare `Json` rejects malformed bodies with a plain-text 422. Every
/// body failure here - invalid JSON, missing fields, a value the validated
/// `Deserialize` impl refuses - becomes a 400 with the usual
/// `{ success: false, error }` body instead.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

/// Application state shared across all handlers
///
/// All fields are Arc'd (or internally Arc'd) for cheap cloning across Axum
/// handlers and the middleware stack.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    router: Arc<ModelRouter>,
    metrics: Metrics,
    gate: Arc<SecurityGate>,
}

impl AppState {
    /// Create a new AppState from configuration
    ///
    /// Reads provider credentials from the environment and spawns the audit
    /// delivery task when an audit sink is configured, so this must run
    /// inside the Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn new(config: Config) -> crate::error::AppResult<Self> {
        let metrics = Metrics::new()
            .map_err(|e| crate::error::AppError::Internal(format!("metrics setup: {}", e)))?;

        let config = Arc::new(config);
        let registry = Arc::new(ProviderRegistry::from_config(&config.providers));
        let router = Arc::new(ModelRouter::new(
            registry.clone(),
            metrics.clone(),
            Duration::from_secs(config.server.provider_timeout_seconds),
        ));

        let audit = AuditLogger::new(config.audit.as_ref(), metrics.clone());
        let gate = Arc::new(SecurityGate::new(
            &config,
            Arc::new(MemoryRateLimitStore::new()),
            audit,
            metrics.clone(),
        ));

        Ok(Self {
            config,
            registry,
            router,
            metrics,
            gate,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn router(&self) -> &ModelRouter {
        &self.router
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn gate(&self) -> &SecurityGate {
        &self.gate
    }
}
