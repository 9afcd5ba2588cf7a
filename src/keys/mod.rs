//! Verification key management subsystem.
//!
//! # Data Flow
//! ```text
//! local JWKS file ──────────────┐
//!                               ├─→ KeySet (immutable, kid → key)
//! identity provider (reqwest) ──┘        │
//!                                        ▼
//!                              KeySource (ArcSwap<KeySet>)
//!                                        │
//!          periodic + on-demand refresh, │ atomic whole-set swap
//!                                        ▼
//!                              auth gate verifications
//! ```

pub mod jwks;
pub mod source;

pub use jwks::{fetch_jwk_set, load_jwks_file, resolve_jwks_uri, KeySet, KeySourceError, VerifyingKey};
pub use source::KeySource;
