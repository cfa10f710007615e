//! Configuration management for saargate
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Provider credentials are never stored in the file - only the names of the
//! environment variables that carry them. The `ProviderRegistry` reads those
//! variables once at startup.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub rate_limits: RateLimitsConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub audit: Option<AuditConfig>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Uniform timeout applied to every outbound provider call, in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_seconds: u64,
}

fn default_provider_timeout() -> u64 {
    30
}

/// Deployment environment
///
/// Controls whether localhost is accepted as a CORS origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

/// Security gate configuration
///
/// Covers CORS allow-list, CSRF exemptions, and the auth-protected path
/// prefixes. Defaults mirror the production deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Optional deployment-specific preview origin (e.g. a per-branch URL),
    /// appended to the allow-list when present
    #[serde(default)]
    pub preview_origin: Option<String>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_protected_paths")]
    pub protected_paths: Vec<String>,
    #[serde(default = "default_csrf_exempt_paths")]
    pub csrf_exempt_paths: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            preview_origin: None,
            environment: Environment::default(),
            protected_paths: default_protected_paths(),
            csrf_exempt_paths: default_csrf_exempt_paths(),
        }
    }
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "https://agentland.saarland".to_string(),
        "https://www.agentland.saarland".to_string(),
    ]
}

fn default_protected_paths() -> Vec<String> {
    vec![
        "/api/premium".to_string(),
        "/api/analytics".to_string(),
        "/api/admin".to_string(),
    ]
}

fn default_csrf_exempt_paths() -> Vec<String> {
    vec!["/api/auth".to_string()]
}

impl SecurityConfig {
    /// Full CORS allow-list: configured origins, the optional preview origin,
    /// and localhost in development
    pub fn effective_origins(&self) -> Vec<String> {
        let mut origins = self.allowed_origins.clone();
        if let Some(preview) = &self.preview_origin {
            origins.push(preview.clone());
        }
        if self.environment == Environment::Development {
            origins.push("http://localhost:3000".to_string());
        }
        origins
    }
}

/// A single rate-limit rule bound to a path prefix
///
/// Fields are private to enforce invariants: `window_ms` and `max_requests`
/// must be greater than zero. Construction goes through `new()`, and the
/// custom `Deserialize` implementation calls it so invalid rules are rejected
/// at parse time rather than at first use.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitRule {
    prefix: String,
    window_ms: u64,
    max_requests: u32,
}

impl RateLimitRule {
    /// Create a validated rule
    ///
    /// # Errors
    ///
    /// Returns an error if `window_ms` or `max_requests` is zero, or if the
    /// prefix does not start with '/'.
    pub fn new(prefix: String, window_ms: u64, max_requests: u32) -> crate::error::AppResult<Self> {
        if !prefix.starts_with('/') {
            return Err(crate::error::AppError::Config(format!(
                "rate limit prefix must start with '/', got '{}'",
                prefix
            )));
        }
        if window_ms == 0 {
            return Err(crate::error::AppError::Config(format!(
                "rate limit window_ms for '{}' must be greater than 0",
                prefix
            )));
        }
        if max_requests == 0 {
            return Err(crate::error::AppError::Config(format!(
                "rate limit max_requests for '{}' must be greater than 0",
                prefix
            )));
        }
        Ok(Self {
            prefix,
            window_ms,
            max_requests,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

impl<'de> Deserialize<'de> for RateLimitRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawRule {
            prefix: String,
            window_ms: u64,
            max_requests: u32,
        }

        let raw = RawRule::deserialize(deserializer)?;
        RateLimitRule::new(raw.prefix, raw.window_ms, raw.max_requests)
            .map_err(serde::de::Error::custom)
    }
}

/// Rate limiting configuration: a default window plus per-prefix overrides
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitsConfig {
    #[serde(default = "default_window_ms")]
    pub default_window_ms: u64,
    #[serde(default = "default_max_requests")]
    pub default_max_requests: u32,
    #[serde(default = "default_rules")]
    pub rules: Vec<RateLimitRule>,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            default_window_ms: default_window_ms(),
            default_max_requests: default_max_requests(),
            rules: default_rules(),
        }
    }
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_max_requests() -> u32 {
    100
}

fn default_rules() -> Vec<RateLimitRule> {
    // Mirrors the production route classes: auth and registration are tightly
    // limited, the quick chat lane gets more headroom than the full chat lane.
    [
        ("/api/auth", 15 * 60 * 1000, 5),
        ("/api/chat/quick", 60 * 1000, 60),
        ("/api/chat", 60 * 1000, 20),
        ("/api/registration", 60 * 60 * 1000, 3),
    ]
    .into_iter()
    .map(|(prefix, window_ms, max_requests)| {
        RateLimitRule::new(prefix.to_string(), window_ms, max_requests)
            .expect("static default rules are valid")
    })
    .collect()
}

/// Per-provider wiring: endpoint, model name, and the env var holding the key
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEndpoint {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
}

/// Provider configuration for the three supported vendors
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_openai")]
    pub openai: ProviderEndpoint,
    #[serde(default = "default_gemini")]
    pub gemini: ProviderEndpoint,
    #[serde(default = "default_deepseek")]
    pub deepseek: ProviderEndpoint,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            gemini: default_gemini(),
            deepseek: default_deepseek(),
        }
    }
}

fn default_openai() -> ProviderEndpoint {
    ProviderEndpoint {
        base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-4-turbo-preview".to_string(),
        api_key_env: "OPENAI_API_KEY".to_string(),
    }
}

fn default_gemini() -> ProviderEndpoint {
    ProviderEndpoint {
        base_url: "https://generativelanguage.googleapis.com".to_string(),
        model: "gemini-2.0-flash-exp".to_string(),
        api_key_env: "GOOGLE_AI_API_KEY".to_string(),
    }
}

fn default_deepseek() -> ProviderEndpoint {
    ProviderEndpoint {
        base_url: "https://api.deepseek.com/v1".to_string(),
        model: "deepseek-reasoner".to_string(),
        api_key_env: "DEEPSEEK_API_KEY".to_string(),
    }
}

/// External auth service used to validate bearer tokens on protected paths
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub base_url: String,
}

/// External datastore receiving fire-and-forget security events
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    pub rest_url: String,
    #[serde(default = "default_audit_key_env")]
    pub service_key_env: String,
}

fn default_audit_key_env() -> String {
    "AUDIT_SERVICE_KEY".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate cross-field invariants not expressible at parse time
    pub fn validate(&self) -> crate::error::AppResult<()> {
        if self.server.provider_timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "server.provider_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.server.provider_timeout_seconds > 300 {
            return Err(crate::error::AppError::Config(format!(
                "server.provider_timeout_seconds cannot exceed 300 seconds, got {}",
                self.server.provider_timeout_seconds
            )));
        }

        for origin in &self.security.allowed_origins {
            if !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(crate::error::AppError::Config(format!(
                    "allowed origin '{}' must include a scheme",
                    origin
                )));
            }
            if origin.ends_with('/') {
                return Err(crate::error::AppError::Config(format!(
                    "allowed origin '{}' must not have a trailing slash (origins are matched exactly)",
                    origin
                )));
            }
        }

        for path in self
            .security
            .protected_paths
            .iter()
            .chain(self.security.csrf_exempt_paths.iter())
        {
            if !path.starts_with('/') {
                return Err(crate::error::AppError::Config(format!(
                    "path prefix '{}' must start with '/'",
                    path
                )));
            }
        }

        if self.rate_limits.default_window_ms == 0 || self.rate_limits.default_max_requests == 0 {
            return Err(crate::error::AppError::Config(
                "rate_limits defaults must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
