//! JWKS parsing and retrieval.
//!
//! Builds the verification key set from RFC 7517 documents, either read from
//! a local file or fetched from the identity provider. The JWKS location is
//! resolved directly (`/.well-known/jwks.json`) or through OpenID discovery
//! (`/.well-known/openid-configuration`).

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use url::Url;

use crate::config::SecurityConfig;

/// Error type for key source operations.
#[derive(Debug, thiserror::Error)]
pub enum KeySourceError {
    #[error("key fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JWKS decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error reading JWKS: {0}")]
    Io(#[from] std::io::Error),

    #[error("OpenID discovery failed: {0}")]
    Discovery(String),

    #[error("JWKS contains no usable verification keys")]
    NoUsableKeys,
}

/// A single verification key with its expected algorithm.
#[derive(Clone)]
pub struct VerifyingKey {
    pub decoding: DecodingKey,
    pub algorithm: Algorithm,
}

/// An immutable set of verification keys, keyed by `kid`.
///
/// Replaced wholesale on refresh; never mutated in place, so concurrent
/// verifications observe either the old set or the new one.
pub struct KeySet {
    keys: HashMap<String, VerifyingKey>,
    fetched_at: Instant,
}

impl KeySet {
    /// Build a key set from a parsed JWKS document.
    ///
    /// Keys without a `kid` or with unsupported parameters are skipped with
    /// a warning; a document yielding zero usable keys is an error.
    pub fn from_jwk_set(jwks: &JwkSet) -> Result<Self, KeySourceError> {
        let mut keys = HashMap::new();

        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                tracing::warn!("Skipping JWK without kid");
                continue;
            };

            let Some(algorithm) = signing_algorithm(jwk) else {
                tracing::warn!(kid = %kid, "Skipping JWK with unsupported key type");
                continue;
            };

            match DecodingKey::from_jwk(jwk) {
                Ok(decoding) => {
                    keys.insert(kid, VerifyingKey { decoding, algorithm });
                }
                Err(e) => {
                    tracing::warn!(kid = %kid, error = %e, "Skipping unparsable JWK");
                }
            }
        }

        if keys.is_empty() {
            return Err(KeySourceError::NoUsableKeys);
        }

        Ok(Self {
            keys,
            fetched_at: Instant::now(),
        })
    }

    /// Look up a key by its identifier.
    pub fn find(&self, kid: &str) -> Option<&VerifyingKey> {
        self.keys.get(kid)
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// When this set was built or fetched.
    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

/// Determine the signature algorithm for a JWK, from its `alg` field when
/// present, otherwise inferred from the key type.
fn signing_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    if let Some(alg) = jwk.common.key_algorithm {
        return match alg {
            KeyAlgorithm::RS256 => Some(Algorithm::RS256),
            KeyAlgorithm::RS384 => Some(Algorithm::RS384),
            KeyAlgorithm::RS512 => Some(Algorithm::RS512),
            KeyAlgorithm::PS256 => Some(Algorithm::PS256),
            KeyAlgorithm::PS384 => Some(Algorithm::PS384),
            KeyAlgorithm::PS512 => Some(Algorithm::PS512),
            KeyAlgorithm::ES256 => Some(Algorithm::ES256),
            KeyAlgorithm::ES384 => Some(Algorithm::ES384),
            KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
            _ => None,
        };
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Some(Algorithm::RS256),
        AlgorithmParameters::EllipticCurve(params) => match params.curve {
            EllipticCurve::P256 => Some(Algorithm::ES256),
            EllipticCurve::P384 => Some(Algorithm::ES384),
            _ => None,
        },
        _ => None,
    }
}

/// Load a key set from a local JWKS file.
pub fn load_jwks_file(path: &Path) -> Result<KeySet, KeySourceError> {
    let content = std::fs::read_to_string(path)?;
    let jwks: JwkSet = serde_json::from_str(&content)?;
    KeySet::from_jwk_set(&jwks)
}

/// OpenID provider configuration document, reduced to the field we need.
#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

/// Resolve the JWKS endpoint for a remote identity provider.
///
/// Prefers OpenID discovery when enabled, falling back to the conventional
/// `/.well-known/jwks.json` location.
pub async fn resolve_jwks_uri(
    client: &reqwest::Client,
    security: &SecurityConfig,
) -> Result<Url, KeySourceError> {
    let base = security
        .issuer_url
        .as_deref()
        .ok_or_else(|| KeySourceError::Discovery("no issuer_url configured".to_string()))?;
    let base = base.trim_end_matches('/');

    if security.openid_configuration_enabled {
        let discovery_url = format!("{}/.well-known/openid-configuration", base);
        let doc: DiscoveryDocument = client
            .get(&discovery_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        return Url::parse(&doc.jwks_uri)
            .map_err(|e| KeySourceError::Discovery(format!("bad jwks_uri '{}': {}", doc.jwks_uri, e)));
    }

    let direct = format!("{}/.well-known/jwks.json", base);
    Url::parse(&direct).map_err(|e| KeySourceError::Discovery(format!("bad issuer_url: {}", e)))
}

/// Fetch and parse a JWKS document from the given endpoint.
pub async fn fetch_jwk_set(client: &reqwest::Client, uri: &Url) -> Result<JwkSet, KeySourceError> {
    let jwks = client
        .get(uri.clone())
        .send()
        .await?
        .error_for_status()?
        .json::<JwkSet>()
        .await?;
    Ok(jwks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_JWKS: &str = r#"{
        "keys": [
            {
                "kty": "RSA",
                "kid": "kid-1",
                "alg": "RS256",
                "use": "sig",
                "n": "nIrCv5_g4_b83FCNtEAYHhf9L655-hkOs1ZUzn7k51Pmwrb6dxm5jhUeSMgS9i-StXo-cB0YzB085ZNP9U5NUr02OrPPjAd8MKcYp4Vh2hOz4a4lN50kYDxsqGH-917q31BVnDMeF34sfELzNSeJZ-2j9zls93_1yFClN54th7u3q45ZqTUQOF0ftBDiYiuPK2bMOR8tu_2rP5AMQ_TdDctZvlK7FVFIhjI1Nyfc2PefU_jh1CvmCCQN2MF3IvqzEbmdM5J297zq9BTxds8vGUobp2NPtxUktgJpbJ_S6mG89gQxVga_-NE4qIy_n0xAifa_rGpGWFbMZ8Pub7iTfw",
                "e": "AQAB"
            },
            {
                "kty": "RSA",
                "use": "sig",
                "n": "nIrCv5_g4_b83FCNtEAYHhf9L655-hkOs1ZUzn7k51Pmwrb6dxm5jhUeSMgS9i-StXo-cB0YzB085ZNP9U5NUr02OrPPjAd8MKcYp4Vh2hOz4a4lN50kYDxsqGH-917q31BVnDMeF34sfELzNSeJZ-2j9zls93_1yFClN54th7u3q45ZqTUQOF0ftBDiYiuPK2bMOR8tu_2rP5AMQ_TdDctZvlK7FVFIhjI1Nyfc2PefU_jh1CvmCCQN2MF3IvqzEbmdM5J297zq9BTxds8vGUobp2NPtxUktgJpbJ_S6mG89gQxVga_-NE4qIy_n0xAifa_rGpGWFbMZ8Pub7iTfw",
                "e": "AQAB"
            }
        ]
    }"#;

    #[test]
    fn builds_key_set_skipping_keys_without_kid() {
        let jwks: JwkSet = serde_json::from_str(TEST_JWKS).unwrap();
        let set = KeySet::from_jwk_set(&jwks).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.find("kid-1").is_some());
        assert!(set.find("other").is_none());
    }

    #[test]
    fn algorithm_taken_from_alg_field() {
        let jwks: JwkSet = serde_json::from_str(TEST_JWKS).unwrap();
        let set = KeySet::from_jwk_set(&jwks).unwrap();
        assert!(matches!(set.find("kid-1").unwrap().algorithm, Algorithm::RS256));
    }

    #[test]
    fn empty_document_is_an_error() {
        let jwks: JwkSet = serde_json::from_str(r#"{"keys": []}"#).unwrap();
        assert!(matches!(
            KeySet::from_jwk_set(&jwks),
            Err(KeySourceError::NoUsableKeys)
        ));
    }
}
