//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active probes (prober.rs):
//!     Periodic timer
//!     → one task per backend per tick
//!     → mark_success / mark_failure on the registry
//!
//! Forwarding outcomes (http::proxy):
//!     Upstream timeout or connection error
//!     → mark_failure on the routed backend
//!     Completed exchange
//!     → mark_success
//! ```
//!
//! # Design Decisions
//! - Probes are isolated per backend; one dead upstream cannot stall a tick
//! - State transitions need `failure_threshold` consecutive failures, and a
//!   single success to recover
//! - Probe errors never surface to clients

pub mod prober;

pub use prober::HealthProber;
