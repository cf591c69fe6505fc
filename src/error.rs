//! Gateway error taxonomy.
//!
//! Every failure a request can run into maps onto one of these variants,
//! and each variant maps onto exactly one client-visible status code.
//! Probe failures never reach a client; they are logged and folded into
//! registry state by the health subsystem.

use axum::http::StatusCode;
use thiserror::Error;

/// Errors produced while routing a request or probing a backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The policy engine rejected the request before any routing work.
    #[error("request denied by policy: {0}")]
    PolicyDenied(String),

    /// The registry holds no backends at all.
    #[error("no backends configured")]
    NoBackendAvailable,

    /// Every backend is unhealthy and fail-closed mode is active.
    #[error("no healthy backend available")]
    NoHealthyBackend,

    /// The upstream did not answer within the forwarding deadline.
    #[error("upstream request timed out")]
    UpstreamTimeout,

    /// The upstream connection failed outright.
    #[error("upstream connection failed: {0}")]
    UpstreamConnection(String),

    /// A health probe failed. Internal only; folded into registry state.
    #[error("health probe failed: {0}")]
    ProbeFailure(String),
}

impl GatewayError {
    /// Status code surfaced to the client for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::PolicyDenied(_) => StatusCode::FORBIDDEN,
            GatewayError::NoBackendAvailable | GatewayError::NoHealthyBackend => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::UpstreamTimeout | GatewayError::UpstreamConnection(_) => {
                StatusCode::BAD_GATEWAY
            }
            // Never surfaced; mapped defensively if it ever escapes.
            GatewayError::ProbeFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the failure should count against the backend that served it.
    pub fn counts_as_backend_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::UpstreamTimeout | GatewayError::UpstreamConnection(_)
        )
    }
}
