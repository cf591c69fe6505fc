//! Security hardening.
//!
//! # Design Decisions
//! - The header set is applied by response middleware so every outbound
//!   response carries it, including errors and the fallback page
//! - Client-visible error bodies are constants; nothing request- or
//!   backend-derived is ever interpolated into them

pub mod headers;

pub use headers::SecurityHeaderSet;
