//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → stop accepting → drain in-flight requests
//!     → forced exit after the grace period
//!
//! Signals (signals.rs):
//!     SIGTERM / SIGINT / ctrl-c → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - The prober exits on the first broadcast; requests get the grace period
//! - Drain has a deadline: forced exit once the grace period elapses

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
