//! Policy subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (client IP, scheme, host, URI)
//!     → engine.rs (ordered rule evaluation, first match wins)
//!     → Decision: Allow | Deny(reason) | Redirect(location)
//! ```
//!
//! # Design Decisions
//! - Rules compiled from config at startup/reload, immutable in between
//! - Blocklist is always evaluated before the HTTPS upgrade so rejected
//!   clients cost nothing beyond the set lookup
//! - Deny responses carry a constant body; reasons stay in the logs

pub mod engine;
pub mod rules;

pub use engine::{Decision, PolicyEngine, RequestContext};
