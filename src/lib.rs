//! Health-aware reverse-proxy traffic router.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 EDGE GATEWAY                  │
//!                    │                                               │
//!   Client Request   │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ─────────────────┼─▶│  http   │──▶│  policy  │──▶│   load    │  │
//!                    │  │ server  │   │  engine  │   │ balancer  │  │
//!                    │  └─────────┘   └──────────┘   └─────┬─────┘  │
//!                    │                                      │        │
//!                    │                                      ▼        │
//!   Client Response  │  ┌──────────┐   ┌──────────┐  ┌───────────┐  │
//!   ◀────────────────┼──│ security │◀──│ response │◀─│  backend  │◀─┼── Backend
//!                    │  │ headers  │   │ shaping  │  │  forward  │  │   Server
//!                    │  └──────────┘   └──────────┘  └───────────┘  │
//!                    │                                               │
//!                    │  ┌─────────────────────────────────────────┐ │
//!                    │  │          Cross-Cutting Concerns          │ │
//!                    │  │  ┌────────┐ ┌────────┐ ┌─────────────┐  │ │
//!                    │  │  │ config │ │ health │ │observability│  │ │
//!                    │  │  │ +reload│ │ prober │ │ logs/metrics│  │ │
//!                    │  │  └────────┘ └────────┘ └─────────────┘  │ │
//!                    │  │  ┌────────────────────────────────────┐ │ │
//!                    │  │  │     lifecycle: signals/shutdown     │ │ │
//!                    │  │  └────────────────────────────────────┘ │ │
//!                    │  └─────────────────────────────────────────┘ │
//!                    └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod policy;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
