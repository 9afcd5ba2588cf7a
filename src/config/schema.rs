//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the token gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Security gate settings (issuers, key source, skew tolerance).
    pub security: SecurityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Startup precompute snapshot settings.
    pub precompute: PrecomputeConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum requests in flight at once; excess requests queue until a
    /// slot frees up or the request timeout fires.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Security gate configuration.
///
/// Exactly one key source must be configured: either `jwks_path` (static
/// local JWKS file, never refreshed) or `issuer_url` (remote identity
/// provider, fetched at startup and refreshed periodically).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Issuer allow-list. Tokens whose `iss` claim is not listed here are
    /// rejected. Mandatory; an empty list is a fatal startup error.
    pub allowed_issuers: Vec<String>,

    /// Path to a static local JWKS file (RFC 7517 JSON).
    pub jwks_path: Option<String>,

    /// Base URL of the identity provider for remote key fetching.
    pub issuer_url: Option<String>,

    /// Resolve the JWKS location directly as `{issuer_url}/.well-known/jwks.json`.
    pub jwks_enabled: bool,

    /// Resolve the JWKS location via OpenID discovery
    /// (`{issuer_url}/.well-known/openid-configuration`). Takes precedence
    /// over `jwks_enabled` when both are set.
    pub openid_configuration_enabled: bool,

    /// Clock skew tolerance for expiry checks, in seconds.
    pub clock_skew_tolerance_secs: u64,

    /// Background key refresh interval in seconds (remote sources only).
    pub refresh_interval_secs: u64,

    /// Timeout for a single key fetch attempt in seconds.
    pub refresh_timeout_secs: u64,

    /// Minimum spacing between on-demand refreshes in seconds. Bounds the
    /// traffic an unknown-kid storm can generate toward the provider.
    pub refresh_cooldown_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_issuers: Vec::new(),
            jwks_path: None,
            issuer_url: None,
            jwks_enabled: true,
            openid_configuration_enabled: true,
            clock_skew_tolerance_secs: 30,
            refresh_interval_secs: 300,
            refresh_timeout_secs: 5,
            refresh_cooldown_secs: 10,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Startup precompute snapshot configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PrecomputeConfig {
    /// Path to the startup snapshot file. If the file is absent or does not
    /// match the current configuration, all values are recomputed directly.
    pub snapshot_path: Option<String>,
}

impl GateConfig {
    /// Apply environment variable overrides for deployment-critical settings.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("GATE_BIND_ADDRESS") {
            self.listener.bind_address = addr;
        }
        if let Ok(url) = std::env::var("GATE_ISSUER_URL") {
            self.security.issuer_url = Some(url);
        }
    }
}
