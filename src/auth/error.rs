//! Security gate error taxonomy.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Reasons a request fails authorization.
///
/// Every variant fails closed. The client-side kinds map to 401; an
/// unreachable key source is not the caller's fault and maps to 503.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header absent or malformed")]
    MissingCredential,

    #[error("token is not a well-formed JWT")]
    MalformedToken,

    #[error("no key matches the token key identifier")]
    UnknownKey,

    #[error("token signature verification failed")]
    InvalidSignature,

    #[error("token issuer is not trusted")]
    UntrustedIssuer,

    #[error("token is expired")]
    ExpiredToken,

    #[error("key source unavailable")]
    KeySourceUnavailable,
}

impl AuthError {
    /// Stable short name, used for logs and metric labels.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::MalformedToken => "malformed_token",
            AuthError::UnknownKey => "unknown_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::UntrustedIssuer => "untrusted_issuer",
            AuthError::ExpiredToken => "expired_token",
            AuthError::KeySourceUnavailable => "key_source_unavailable",
        }
    }

    /// HTTP status this rejection maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::KeySourceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, self.reason()).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
