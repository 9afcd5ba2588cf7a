//! Token claims and the authorized-request context.

use serde::Deserialize;

/// Claims carried by a verified token.
///
/// Only the claims the gate checks are typed; everything else is kept
/// as-is for downstream handlers.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject the token asserts.
    pub sub: String,

    /// Issuer that minted the token.
    pub iss: String,

    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,

    /// Remaining claims, untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Context attached to requests that passed the security gate.
///
/// Inserted into request extensions by the gate middleware; handlers extract
/// it to learn who the caller is.
#[derive(Debug, Clone)]
pub struct AuthorizedRequest {
    pub subject: String,
    pub issuer: String,
    pub claims: TokenClaims,
}

impl AuthorizedRequest {
    pub fn new(claims: TokenClaims) -> Self {
        Self {
            subject: claims.sub.clone(),
            issuer: claims.iss.clone(),
            claims,
        }
    }
}
