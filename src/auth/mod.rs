//! Security gate subsystem.
//!
//! Every inbound request passes through [`gate::gate_middleware`] before any
//! handler runs. Verification is stateless per request; the shared pieces are
//! the key source (atomic swaps only) and the issuer allow-list (immutable).

pub mod claims;
pub mod error;
pub mod gate;

pub use claims::{AuthorizedRequest, TokenClaims};
pub use error::AuthError;
pub use gate::{gate_middleware, Gate, GateState};
