//! The security gate: bearer-token verification in front of all handlers.
//!
//! # Verification pipeline
//! ```text
//! Authorization header → extract bearer token   (MissingCredential)
//!     → decode JWT header, require kid          (MalformedToken)
//!     → resolve key; one bounded refresh        (UnknownKey / KeySourceUnavailable)
//!     → verify signature                        (InvalidSignature)
//!     → check issuer allow-list                 (UntrustedIssuer)
//!     → check expiry within skew tolerance      (ExpiredToken)
//!     → AuthorizedRequest
//! ```
//!
//! The gate is stateless per request; the only suspension point is the
//! bounded key refresh.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};

use crate::auth::claims::{AuthorizedRequest, TokenClaims};
use crate::auth::error::AuthError;
use crate::config::SecurityConfig;
use crate::keys::{KeySource, VerifyingKey};
use crate::observability::metrics;

/// The security gate. Shared across all request workers.
pub struct Gate {
    keys: Arc<KeySource>,
    allowed_issuers: HashSet<String>,
    skew_tolerance: Duration,
}

impl Gate {
    pub fn new(keys: Arc<KeySource>, security: &SecurityConfig) -> Self {
        Self {
            keys,
            allowed_issuers: security.allowed_issuers.iter().cloned().collect(),
            skew_tolerance: Duration::from_secs(security.clock_skew_tolerance_secs),
        }
    }

    /// Authorize a request from its headers.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<AuthorizedRequest, AuthError> {
        let token = extract_bearer(headers)?;
        self.verify(token).await
    }

    /// Verify a raw token. Also used by the CLI for offline checks.
    pub async fn verify(&self, token: &str) -> Result<AuthorizedRequest, AuthError> {
        let jwt_header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        let kid = jwt_header.kid.ok_or(AuthError::MalformedToken)?;

        let key = self.resolve_key(&kid).await?;

        // Signature only; issuer and expiry are checked explicitly below so
        // each failure surfaces as its own kind.
        let mut validation = Validation::new(key.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = Default::default();

        let data = decode::<TokenClaims>(token, &key.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::Crypto(_) => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            }
        })?;
        let claims = data.claims;

        if !self.allowed_issuers.contains(&claims.iss) {
            return Err(AuthError::UntrustedIssuer);
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if is_expired(claims.exp, self.skew_tolerance.as_secs(), now) {
            return Err(AuthError::ExpiredToken);
        }

        Ok(AuthorizedRequest::new(claims))
    }

    /// Resolve the verification key for a kid, refreshing the key source at
    /// most once when the kid is unknown.
    async fn resolve_key(&self, kid: &str) -> Result<VerifyingKey, AuthError> {
        if let Some(key) = self.keys.current().find(kid) {
            return Ok(key.clone());
        }

        let refreshed = self
            .keys
            .refresh()
            .await
            .map_err(|_| AuthError::KeySourceUnavailable)?;

        refreshed.find(kid).cloned().ok_or(AuthError::UnknownKey)
    }
}

/// Pull the bearer token out of the Authorization header.
///
/// The scheme is matched case-insensitively per RFC 7235.
fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MissingCredential)?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::MissingCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingCredential);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredential);
    }

    Ok(token)
}

/// Expired once now is past exp plus the skew tolerance.
fn is_expired(exp: u64, skew_secs: u64, now: u64) -> bool {
    now > exp.saturating_add(skew_secs)
}

/// State injected into the gate middleware.
#[derive(Clone)]
pub struct GateState {
    pub gate: Arc<Gate>,
}

/// Axum middleware enforcing the gate on every request it wraps.
///
/// On success the [`AuthorizedRequest`] is inserted into request extensions;
/// on failure the rejection is returned immediately and the handler never
/// runs. Request state is never mutated on failure.
pub async fn gate_middleware(
    State(state): State<GateState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    match state.gate.authorize(request.headers()).await {
        Ok(authorized) => {
            metrics::record_request("authorized");
            tracing::debug!(
                request_id = %request_id,
                subject = %authorized.subject,
                "Request authorized"
            );
            request.extensions_mut().insert(authorized);
            next.run(request).await
        }
        Err(err) => {
            metrics::record_request("rejected");
            metrics::record_rejection(err.reason());
            tracing::warn!(
                request_id = %request_id,
                reason = err.reason(),
                "Request rejected"
            );
            err.into_response()
        }
    }
}
