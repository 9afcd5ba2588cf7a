//! Startup optimization cache.
//!
//! # Data Flow
//! ```text
//! build pass (gate-cli snapshot):
//!     config → build.rs derives entries → snapshot.json on disk
//!
//! boot pass:
//!     snapshot.json (if present and matching) → Snapshot (read-only)
//!     → bootstrap consumes entries instead of recomputing
//!     → absent/stale snapshot: recompute directly, no behavior change
//! ```
//!
//! The cache is an optimization, never a correctness dependency.

pub mod build;
pub mod snapshot;

pub use build::{build_snapshot, config_fingerprint, deduce_environment};
pub use snapshot::{Snapshot, KEY_ENVIRONMENT, KEY_JWKS_URI};
