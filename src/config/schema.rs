//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so a minimal (or absent) config file works.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Upstream backend definitions.
    pub backends: Vec<BackendConfig>,

    /// Health probe settings.
    pub health_check: HealthCheckConfig,

    /// Policy rules evaluated before any routing work.
    pub policy: PolicyConfig,

    /// Forwarding behavior.
    pub proxy: ProxyConfig,

    /// Cache header injection for static assets.
    pub cache: CacheConfig,

    /// Response headers applied to every outbound response.
    #[serde(default = "default_security_headers")]
    pub security_headers: BTreeMap<String, String>,

    /// Response served for paths outside the proxied prefix.
    pub fallback: FallbackConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Shutdown drain settings.
    pub shutdown: ShutdownConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backends: Vec::new(),
            health_check: HealthCheckConfig::default(),
            policy: PolicyConfig::default(),
            proxy: ProxyConfig::default(),
            cache: CacheConfig::default(),
            security_headers: default_security_headers(),
            fallback: FallbackConfig::default(),
            observability: ObservabilityConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Upstream backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique backend identifier.
    pub id: String,

    /// Backend base URL (e.g., "http://127.0.0.1:3000").
    pub url: String,

    /// Weight for weighted round-robin (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

/// Health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health probes.
    pub enabled: bool,

    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Path probed on each backend.
    pub path: String,

    /// Consecutive failures before a backend is marked unhealthy.
    pub failure_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 10_000,
            timeout_ms: 2_000,
            path: "/health".to_string(),
            failure_threshold: 3,
        }
    }
}

/// Policy rules evaluated before routing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Client IPs that are denied outright.
    pub blocked_ips: Vec<IpAddr>,

    /// Redirect plain-HTTP requests to HTTPS.
    pub enforce_https: bool,

    /// Trusted header carrying the original client IP.
    pub forwarded_for_header: String,

    /// Trusted header carrying the original scheme.
    pub forwarded_proto_header: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            blocked_ips: Vec::new(),
            enforce_https: true,
            forwarded_for_header: "x-forwarded-for".to_string(),
            forwarded_proto_header: "x-forwarded-proto".to_string(),
        }
    }
}

/// Forwarding behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Only paths under this prefix are forwarded to backends.
    pub path_prefix: String,

    /// Upstream forwarding deadline in milliseconds.
    pub upstream_timeout_ms: u64,

    /// Whole-request deadline enforced at the server edge, in milliseconds.
    pub request_timeout_ms: u64,

    /// Retry once against a different backend on upstream failure.
    pub retry_on_failure: bool,

    /// Refuse to route when no backend is healthy instead of degrading.
    pub fail_closed: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/api".to_string(),
            upstream_timeout_ms: 10_000,
            request_timeout_ms: 15_000,
            retry_on_failure: false,
            fail_closed: false,
        }
    }
}

/// Cache header injection for static assets.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path extensions that receive a cache header.
    pub static_asset_extensions: Vec<String>,

    /// `max-age` value for the injected Cache-Control header, in seconds.
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            static_asset_extensions: vec![
                "jpg".to_string(),
                "png".to_string(),
                "css".to_string(),
                "js".to_string(),
            ],
            max_age_secs: 86_400,
        }
    }
}

/// Response served for paths outside the proxied prefix.
///
/// With no body configured the gateway answers 404; a configured body is
/// served as-is with status 200. The body is static content only — it never
/// embeds the client address or any backend identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Static body returned for non-proxied paths.
    pub body: Option<String>,

    /// Content type of the configured body.
    pub content_type: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            body: None,
            content_type: "text/html; charset=utf-8".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
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

/// Shutdown drain settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long in-flight requests may drain before forced exit, in ms.
    pub grace_period_ms: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 5_000,
        }
    }
}

fn default_security_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert(
        "Strict-Transport-Security".to_string(),
        "max-age=31536000; includeSubDomains; preload".to_string(),
    );
    headers.insert("X-Content-Type-Options".to_string(), "nosniff".to_string());
    headers.insert("X-Frame-Options".to_string(), "DENY".to_string());
    headers.insert("X-XSS-Protection".to_string(), "1; mode=block".to_string());
    headers.insert(
        "Referrer-Policy".to_string(),
        "strict-origin-when-cross-origin".to_string(),
    );
    headers.insert(
        "Content-Security-Policy".to_string(),
        "default-src 'self' https:; script-src 'self' 'unsafe-inline' https:; \
         style-src 'self' 'unsafe-inline' https:; img-src 'self' data: https:;"
            .to_string(),
    );
    headers
}
