//! Command-line interface for saargate
//!
//! Provides argument parsing and subcommand handling for the saargate binary.

use clap::{Parser, Subcommand};

/// Regional AI assistant gateway for the Saarland
#[derive(Parser)]
#[command(name = "saargate")]
#[command(version)]
#[command(about = "Regional AI assistant gateway for the Saarland")]
#[command(
    long_about = "Saargate fronts multiple AI providers (Gemini, DeepSeek, OpenAI) with \
    heuristic routing, sequential fallback, rate limiting, and a security gate. When every \
    provider fails, a deterministic responder still answers."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Saargate Configuration
# ======================
#
# This file configures the HTTP server, security gate, rate limits, and
# AI providers. Credentials are NEVER stored here - only the names of the
# environment variables that carry them.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 3000

# Uniform timeout applied to every outbound provider call, in seconds (max 300)
provider_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# SECURITY GATE
# ─────────────────────────────────────────────────────────────────────────────

[security]
# CORS allow-list. Origins are matched EXACTLY (scheme included, no trailing
# slash). Requests from other origins get no Access-Control-Allow-Origin.
allowed_origins = ["https://agentland.saarland", "https://www.agentland.saarland"]

# Optional per-deployment preview origin, appended to the allow-list
# preview_origin = "https://preview-abc123.agentland.saarland"

# "production" or "development". Development adds http://localhost:3000
# to the CORS allow-list.
environment = "production"

# Path prefixes that require a valid bearer token or session cookie
protected_paths = ["/api/premium", "/api/analytics", "/api/admin"]

# Path prefixes exempt from CSRF double-submit validation
csrf_exempt_paths = ["/api/auth"]

# ─────────────────────────────────────────────────────────────────────────────
# RATE LIMITS
# ─────────────────────────────────────────────────────────────────────────────
#
# Requests are bucketed per client identity (ip:device-id:user-agent) and per
# route class. The longest matching prefix wins; unmatched paths use the
# defaults below.

[rate_limits]
default_window_ms = 60000
default_max_requests = 100

[[rate_limits.rules]]
prefix = "/api/auth"
window_ms = 900000      # 15 minutes
max_requests = 5

[[rate_limits.rules]]
prefix = "/api/chat/quick"
window_ms = 60000
max_requests = 60

[[rate_limits.rules]]
prefix = "/api/chat"
window_ms = 60000
max_requests = 20

[[rate_limits.rules]]
prefix = "/api/registration"
window_ms = 3600000     # 1 hour
max_requests = 3

# ─────────────────────────────────────────────────────────────────────────────
# AI PROVIDERS
# ─────────────────────────────────────────────────────────────────────────────
#
# A provider whose key env var is unset (or holds an obviously malformed
# value) is skipped at startup; the gateway still runs on the remaining
# providers, or on fallback answers alone.

[providers.gemini]
base_url = "https://generativelanguage.googleapis.com"
model = "gemini-2.0-flash-exp"
api_key_env = "GOOGLE_AI_API_KEY"

[providers.deepseek]
base_url = "https://api.deepseek.com/v1"
model = "deepseek-reasoner"
api_key_env = "DEEPSEEK_API_KEY"

[providers.openai]
base_url = "https://api.openai.com/v1"
model = "gpt-4-turbo-preview"
api_key_env = "OPENAI_API_KEY"

# ─────────────────────────────────────────────────────────────────────────────
# AUTH SERVICE (Optional)
# ─────────────────────────────────────────────────────────────────────────────
#
# External service used to validate bearer tokens on protected paths.
# Without this section, protected paths reject all requests.

# [auth]
# base_url = "https://auth.agentland.saarland"

# ─────────────────────────────────────────────────────────────────────────────
# AUDIT SINK (Optional)
# ─────────────────────────────────────────────────────────────────────────────
#
# Security events (rate-limit violations, CSRF rejections, auth failures)
# are POSTed fire-and-forget to this REST endpoint. The service key is read
# from the named environment variable.

# [audit]
# rest_url = "https://data.agentland.saarland"
# service_key_env = "AUDIT_SERVICE_KEY"

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
# For production, consider using a reverse proxy to restrict access
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_config_path() {
        let cli = Cli::parse_from(["saargate"]);
        assert_eq!(cli.config, "config.toml");
        assert!(cli.command.is_none());
    }

    #[test]
    fn custom_config_path() {
        let cli = Cli::parse_from(["saargate", "--config", "custom.toml"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn config_subcommand() {
        let cli = Cli::parse_from(["saargate", "config"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: None })
        ));
    }

    #[test]
    fn config_subcommand_with_output() {
        let cli = Cli::parse_from(["saargate", "config", "-o", "my-config.toml"]);
        assert!(matches!(
            cli.command,
            Some(Command::Config { output: Some(ref path) }) if path == "my-config.toml"
        ));
    }

    #[test]
    fn template_is_valid_toml() {
        let template = generate_config_template();
        let result: Result<toml::Value, _> = toml::from_str(template);
        assert!(
            result.is_ok(),
            "Template should be valid TOML: {:?}",
            result.err()
        );
    }

    #[test]
    fn template_parses_as_full_config() {
        let config: crate::config::Config =
            toml::from_str(generate_config_template()).expect("template should parse as Config");
        config.validate().expect("template should validate");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn template_has_all_sections() {
        let template = generate_config_template();
        assert!(template.contains("[server]"));
        assert!(template.contains("[security]"));
        assert!(template.contains("[rate_limits]"));
        assert!(template.contains("[[rate_limits.rules]]"));
        assert!(template.contains("[providers.gemini]"));
        assert!(template.contains("[providers.deepseek]"));
        assert!(template.contains("[providers.openai]"));
        assert!(template.contains("[observability]"));
    }
}
