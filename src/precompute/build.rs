//! Snapshot build pass.
//!
//! Runs at build/deploy time (via `gate-cli snapshot`), never during normal
//! startup. Derives the values repeated startups would otherwise recompute:
//! the deduced environment and the resolved JWKS endpoint (the discovery
//! round trip).

use std::time::Duration;

use crate::config::GateConfig;
use crate::keys::{resolve_jwks_uri, KeySourceError};
use crate::precompute::snapshot::{Snapshot, KEY_ENVIRONMENT, KEY_JWKS_URI};

/// Fingerprint of the configuration fields the snapshot depends on.
///
/// Plain field concatenation rather than a hash: stable across processes and
/// trivially debuggable.
pub fn config_fingerprint(config: &GateConfig) -> String {
    let sec = &config.security;
    format!(
        "v1|{}|{}|{}|{}|{}",
        config.listener.bind_address,
        sec.issuer_url.as_deref().unwrap_or("-"),
        sec.jwks_path.as_deref().unwrap_or("-"),
        sec.jwks_enabled,
        sec.openid_configuration_enabled,
    )
}

/// Deduce the effective environment name from the process environment.
pub fn deduce_environment() -> String {
    std::env::var("GATE_ENV").unwrap_or_else(|_| "production".to_string())
}

/// Run the build pass, deriving every snapshot entry for this configuration.
pub async fn build_snapshot(config: &GateConfig) -> Result<Snapshot, KeySourceError> {
    let mut snapshot = Snapshot::new(config_fingerprint(config));

    snapshot.put(KEY_ENVIRONMENT, deduce_environment());

    if config.security.issuer_url.is_some() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.security.refresh_timeout_secs))
            .build()?;
        let jwks_uri = resolve_jwks_uri(&client, &config.security).await?;
        snapshot.put(KEY_JWKS_URI, jwks_uri.to_string());
    }

    Ok(snapshot)
}
