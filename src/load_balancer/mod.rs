//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request cleared by policy
//!     → registry.rs (snapshot current backends + health)
//!     → weighted.rs (weighted round-robin over the healthy set)
//!     → Return backend or NoBackendAvailable / NoHealthyBackend
//! ```
//!
//! # Design Decisions
//! - Selection is stateless apart from a single atomic rotation counter
//! - Unhealthy backends are excluded; Unknown backends stay eligible
//! - With no healthy backend the balancer degrades to the least-failed
//!   backend unless fail-closed mode is configured
//! - Health state lives on the backends themselves, not in the balancer

use std::fmt;
use std::sync::Arc;

use crate::error::GatewayError;

pub mod backend;
pub mod registry;
pub mod weighted;

pub use backend::{Backend, HealthState};
pub use registry::BackendRegistry;
pub use weighted::WeightedRoundRobin;

/// Strategy seam for backend selection.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    /// Pick a backend for the next request.
    ///
    /// `backends` is a registry snapshot in configuration order;
    /// `fail_closed` controls behavior when nothing is healthy.
    fn select(
        &self,
        backends: &[Arc<Backend>],
        fail_closed: bool,
    ) -> Result<Arc<Backend>, GatewayError>;
}
