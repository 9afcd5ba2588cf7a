//! JWT-secured HTTP service bootstrap.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                 TOKEN GATE                   │
//!                      │                                              │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌──────────┐  │
//!   ──────────────────-┼─▶│  http   │──▶│   auth   │──▶│ handler  │  │
//!                      │  │ server  │   │   gate   │   │ (opaque) │  │
//!                      │  └─────────┘   └────┬─────┘   └──────────┘  │
//!                      │                     │ kid lookup             │
//!                      │                     ▼                        │
//!                      │               ┌──────────┐    JWKS fetch    │
//!                      │               │   keys   │◀───────────────── ┼──── Identity
//!                      │               │ (ArcSwap)│    + discovery    │     Provider
//!                      │               └──────────┘                   │
//!                      │                                              │
//!                      │  ┌────────────────────────────────────────┐  │
//!                      │  │          Cross-Cutting Concerns        │  │
//!                      │  │  ┌────────┐ ┌───────────┐ ┌─────────┐  │  │
//!                      │  │  │ config │ │precompute │ │lifecycle│  │  │
//!                      │  │  └────────┘ └───────────┘ └─────────┘  │  │
//!                      │  │  ┌───────────────┐ ┌───────────────┐   │  │
//!                      │  │  │ observability │ │      net      │   │  │
//!                      │  │  └───────────────┘ └───────────────┘   │  │
//!                      │  └────────────────────────────────────────┘  │
//!                      └──────────────────────────────────────────────┘
//! ```
//!
//! The gate verifies a bearer token (signature, issuer, expiry) against keys
//! from a local JWKS file or a remote identity provider before any handler
//! runs. The precompute snapshot lets repeated startups skip rederiving
//! environment and discovery decisions.

// Core subsystems
pub mod auth;
pub mod config;
pub mod http;
pub mod keys;

// Startup optimization
pub mod precompute;

// Cross-cutting concerns
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use auth::{AuthError, AuthorizedRequest, Gate};
pub use config::GateConfig;
pub use http::HttpServer;
pub use keys::KeySource;
pub use lifecycle::Shutdown;
pub use precompute::Snapshot;
