//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via `tracing`; level from config, overridable with
//!   the standard environment filter
//! - Prometheus exposition runs on its own listener so scrapes never
//!   contend with proxied traffic
//! - Request ids (UUID v4) are set at the edge and propagated upstream

pub mod metrics;
