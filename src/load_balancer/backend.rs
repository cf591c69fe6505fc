//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Track health state (Healthy/Unhealthy/Unknown) lock-free
//! - Track consecutive failures and the last probe/forward timestamp
//!
//! Health writes use release ordering and reads acquire ordering so that
//! prober updates are visible to request-handling tasks.

use std::str::FromStr;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::uri::{Authority, Scheme};
use thiserror::Error;
use url::Url;

/// Health state of a backend.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// A backend URL the gateway cannot route to.
#[derive(Debug, Error)]
pub enum InvalidBackend {
    #[error("backend URL has no usable authority")]
    MissingAuthority,

    #[error("backend URL scheme is not supported")]
    UnsupportedScheme,
}

/// A single upstream server.
#[derive(Debug)]
pub struct Backend {
    /// Unique identifier from configuration.
    pub id: String,
    /// Configured base URL.
    pub base_url: Url,
    /// Pre-parsed scheme for request building.
    pub scheme: Scheme,
    /// Pre-parsed authority for request building and Host rewriting.
    pub authority: Authority,
    /// Weight for weighted round-robin.
    pub weight: u32,

    /// Current health state (0=Unknown, 1=Healthy, 2=Unhealthy).
    state: AtomicU8,
    /// Consecutive failure count.
    consecutive_failures: AtomicU32,
    /// Last probe or forwarding outcome, epoch milliseconds.
    last_checked_ms: AtomicU64,
}

impl Backend {
    /// Create a new backend from a validated base URL.
    pub fn new(id: impl Into<String>, base_url: Url, weight: u32) -> Result<Self, InvalidBackend> {
        let scheme = Scheme::from_str(base_url.scheme())
            .map_err(|_| InvalidBackend::UnsupportedScheme)?;
        let authority = Authority::from_str(base_url.authority())
            .map_err(|_| InvalidBackend::MissingAuthority)?;
        if authority.host().is_empty() {
            return Err(InvalidBackend::MissingAuthority);
        }

        Ok(Self {
            id: id.into(),
            base_url,
            scheme,
            authority,
            weight: weight.max(1),
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicU32::new(0),
            last_checked_ms: AtomicU64::new(0),
        })
    }

    /// Current health state.
    pub fn health_state(&self) -> HealthState {
        self.state.load(Ordering::Acquire).into()
    }

    /// True unless the backend is known-Unhealthy. Unknown backends are
    /// eligible for traffic until a probe says otherwise.
    pub fn is_healthy(&self) -> bool {
        self.health_state() != HealthState::Unhealthy
    }

    /// Current consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    /// When the backend was last probed or forwarded to, epoch milliseconds.
    pub fn last_checked_ms(&self) -> u64 {
        self.last_checked_ms.load(Ordering::Acquire)
    }

    /// Report a successful probe or forwarded request.
    ///
    /// Resets the failure count and marks the backend Healthy. Returns true
    /// if this call transitioned the state.
    pub fn mark_success(&self) -> bool {
        self.consecutive_failures.store(0, Ordering::Release);
        self.touch();
        let prev = self
            .state
            .swap(HealthState::Healthy as u8, Ordering::AcqRel);
        prev != HealthState::Healthy as u8
    }

    /// Report a failed probe or forwarded request.
    ///
    /// Increments the failure count; once it reaches `threshold` the backend
    /// flips to Unhealthy. Returns true if this call transitioned the state.
    pub fn mark_failure(&self, threshold: u32) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        self.touch();
        if failures >= threshold {
            let prev = self
                .state
                .swap(HealthState::Unhealthy as u8, Ordering::AcqRel);
            return prev != HealthState::Unhealthy as u8;
        }
        false
    }

    /// Copy live health state from a previous incarnation of this backend.
    /// Used when reconfiguration keeps a backend id.
    pub(crate) fn inherit_health_from(&self, other: &Backend) {
        self.state
            .store(other.state.load(Ordering::Acquire), Ordering::Release);
        self.consecutive_failures.store(
            other.consecutive_failures.load(Ordering::Acquire),
            Ordering::Release,
        );
        self.last_checked_ms.store(
            other.last_checked_ms.load(Ordering::Acquire),
            Ordering::Release,
        );
    }

    fn touch(&self) {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.last_checked_ms.store(now_ms, Ordering::Release);
    }
}
