//! Security gate: request hygiene enforced before any business logic
//!
//! A linear pipeline of independent checks, each of which can short-circuit
//! to an error response: rate limiting, CORS, content-type validation, CSRF
//! double-submit, and bearer-token auth for protected paths. Every response
//! leaving the gate carries the fixed security header set and the rate-limit
//! headers. Gate decisions emit fire-and-forget audit events.

use crate::audit::AuditLogger;
use crate::config::{Config, SecurityConfig};
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::metrics::Metrics;
use crate::middleware::rate_limit::{
    RateDecision, RateLimitStore, RateLimiter, client_identity, now_ms,
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// Content-Security-Policy enumerating the provider and asset sources
const CSP: &str = "default-src 'self'; \
script-src 'self' 'unsafe-inline'; \
style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
img-src 'self' data: https:; \
font-src 'self' https://fonts.gstatic.com; \
connect-src 'self' https://api.openai.com https://api.deepseek.com https://generativelanguage.googleapis.com; \
object-src 'none'; \
base-uri 'self'; \
form-action 'self'; \
frame-ancestors 'none'; \
upgrade-insecure-requests";

/// Fixed security response headers, identical on every response
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "DENY"),
    ("X-XSS-Protection", "1; mode=block"),
    (
        "Strict-Transport-Security",
        "max-age=31536000; includeSubDomains; preload",
    ),
    ("Referrer-Policy", "strict-origin-when-cross-origin"),
    (
        "Permissions-Policy",
        "geolocation=(), microphone=(), camera=()",
    ),
    ("Content-Security-Policy", CSP),
];

/// Authenticated caller resolved by the external auth service
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
}

/// Validates bearer tokens against the external auth service
pub struct AuthValidator {
    client: reqwest::Client,
    base_url: String,
}

impl AuthValidator {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Validate a token by delegating to the auth provider
    ///
    /// Any transport failure, non-success status, or malformed body counts
    /// as an invalid token - deliberately indistinguishable to the caller.
    pub async fn validate(&self, token: &str) -> AppResult<AuthenticatedUser> {
        #[derive(Deserialize)]
        struct UserPayload {
            id: String,
            #[serde(default)]
            email: String,
        }

        let url = format!("{}/auth/v1/user", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Auth service unreachable");
                AppError::InvalidAuthentication
            })?;

        if !response.status().is_success() {
            return Err(AppError::InvalidAuthentication);
        }

        let user: UserPayload = response
            .json()
            .await
            .map_err(|_| AppError::InvalidAuthentication)?;

        Ok(AuthenticatedUser {
            id: user.id,
            email: user.email,
        })
    }
}

/// The assembled security gate, shared across all requests
pub struct SecurityGate {
    security: SecurityConfig,
    limiter: RateLimiter,
    audit: AuditLogger,
    auth: Option<AuthValidator>,
    metrics: Metrics,
}

impl SecurityGate {
    pub fn new(
        config: &Config,
        store: Arc<dyn RateLimitStore>,
        audit: AuditLogger,
        metrics: Metrics,
    ) -> Self {
        let auth = config
            .auth
            .as_ref()
            .map(|auth| AuthValidator::new(auth.base_url.clone()));

        Self {
            security: config.security.clone(),
            limiter: RateLimiter::new(config.rate_limits.clone(), store),
            audit,
            auth,
            metrics,
        }
    }

    /// Run the gate pipeline for one request
    pub async fn handle(&self, request: Request, next: Next) -> Response {
        let path = request.uri().path().to_string();
        let method = request.method().clone();
        let request_headers = request.headers().clone();

        let identity = client_identity(&request_headers);
        let (decision, route_class) = self.limiter.check(&identity, &path);
        let is_api = path.starts_with("/api/");
        let cors_origin = self.matched_origin(&request_headers);

        if !decision.allowed {
            self.metrics.record_rate_limited(&route_class);
            self.audit.emit(
                "rate_limit_exceeded",
                serde_json::json!({
                    "client_id": identity,
                    "path": path,
                    "route_class": route_class,
                }),
            );
            let retry_after_seconds = decision.retry_after_seconds(now_ms());
            return self.short_circuit(
                AppError::RateLimited {
                    retry_after_seconds,
                },
                &decision,
                cors_origin.as_deref(),
                is_api,
            );
        }

        if is_api {
            // Preflight short-circuits with the full header set
            if method == Method::OPTIONS {
                let mut response = StatusCode::OK.into_response();
                self.finalize(&mut response, &decision, cors_origin.as_deref(), is_api);
                return response;
            }

            if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
                let json_declared = request_headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(|ct| ct.contains("application/json"))
                    .unwrap_or(false);
                if !json_declared {
                    return self.short_circuit(
                        AppError::Validation("Invalid Content-Type".to_string()),
                        &decision,
                        cors_origin.as_deref(),
                        is_api,
                    );
                }
            }

            if matches!(
                method,
                Method::POST | Method::PUT | Method::DELETE | Method::PATCH
            ) && !self.csrf_exempt(&path)
            {
                let header_token = request_headers
                    .get("x-csrf-token")
                    .and_then(|v| v.to_str().ok());
                let cookie_token = cookie_value(&request_headers, "csrf-token");

                let valid = matches!(
                    (header_token, cookie_token.as_deref()),
                    (Some(h), Some(c)) if !h.is_empty() && h == c
                );
                if !valid {
                    self.audit.emit(
                        "csrf_violation",
                        serde_json::json!({
                            "path": path,
                            "client_id": identity,
                            "has_token": header_token.is_some(),
                            "has_cookie": cookie_token.is_some(),
                        }),
                    );
                    return self.short_circuit(
                        AppError::CsrfRejected,
                        &decision,
                        cors_origin.as_deref(),
                        is_api,
                    );
                }
            }
        }

        // Auth gate for protected prefixes
        let mut authenticated_user = None;
        if self
            .security
            .protected_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            let token = bearer_token(&request_headers);
            let Some(token) = token else {
                return self.short_circuit(
                    AppError::AuthenticationRequired,
                    &decision,
                    cors_origin.as_deref(),
                    is_api,
                );
            };

            let validated = match &self.auth {
                Some(validator) => validator.validate(&token).await,
                None => {
                    tracing::warn!(
                        path = %path,
                        "Protected path hit but no auth service configured"
                    );
                    Err(AppError::InvalidAuthentication)
                }
            };

            match validated {
                Ok(user) => authenticated_user = Some(user),
                Err(_) => {
                    self.audit.emit(
                        "auth_failure",
                        serde_json::json!({ "path": path, "client_id": identity }),
                    );
                    return self.short_circuit(
                        AppError::InvalidAuthentication,
                        &decision,
                        cors_origin.as_deref(),
                        is_api,
                    );
                }
            }
        }

        let mut response = next.run(request).await;

        // Resolved identity for downstream consumption
        if let Some(user) = authenticated_user {
            if let Ok(value) = HeaderValue::from_str(&user.id) {
                response.headers_mut().insert("X-User-ID", value);
            }
            if let Ok(value) = HeaderValue::from_str(&user.email) {
                response.headers_mut().insert("X-User-Email", value);
            }
        }

        self.finalize(&mut response, &decision, cors_origin.as_deref(), is_api);
        response
    }

    /// Reflectable CORS origin: exact allow-list match only
    fn matched_origin(&self, headers: &HeaderMap) -> Option<String> {
        let origin = headers.get(header::ORIGIN)?.to_str().ok()?;
        self.security
            .effective_origins()
            .iter()
            .any(|allowed| allowed == origin)
            .then(|| origin.to_string())
    }

    fn csrf_exempt(&self, path: &str) -> bool {
        self.security
            .csrf_exempt_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn short_circuit(
        &self,
        error: AppError,
        decision: &RateDecision,
        cors_origin: Option<&str>,
        is_api: bool,
    ) -> Response {
        let mut response = error.into_response();
        self.finalize(&mut response, decision, cors_origin, is_api);
        response
    }

    /// Apply the standard header set to an outgoing response
    ///
    /// Runs on every path out of the gate, success or short-circuit, so the
    /// header bytes are identical across requests.
    fn finalize(
        &self,
        response: &mut Response,
        decision: &RateDecision,
        cors_origin: Option<&str>,
        is_api: bool,
    ) {
        let headers = response.headers_mut();

        for (name, value) in SECURITY_HEADERS {
            headers.insert(*name, HeaderValue::from_static(value));
        }

        if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
            headers.insert("X-RateLimit-Limit", value);
        }
        if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
            headers.insert("X-RateLimit-Remaining", value);
        }
        if let Ok(value) = HeaderValue::from_str(&decision.reset_at_ms.to_string()) {
            headers.insert("X-RateLimit-Reset", value);
        }

        if is_api {
            headers.insert(
                "Access-Control-Allow-Methods",
                HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
            );
            headers.insert(
                "Access-Control-Allow-Headers",
                HeaderValue::from_static("Content-Type, Authorization, X-CSRF-Token, X-Device-ID"),
            );
            headers.insert(
                "Access-Control-Allow-Credentials",
                HeaderValue::from_static("true"),
            );
            headers.insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));

            // Reflected only on exact allow-list match; omitted otherwise
            if let Some(origin) = cors_origin {
                if let Ok(value) = HeaderValue::from_str(origin) {
                    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                }
            }
        }
    }
}

/// Axum middleware entry point
pub async fn security_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    state.gate().handle(request, next).await
}

/// Extract a named cookie value from the Cookie header
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Bearer token from the session cookie or the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, "session-token").or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.to_string())
    })
}
