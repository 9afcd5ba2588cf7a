//! Process-wide key source with atomic replacement.
//!
//! # Responsibilities
//! - Hold the current [`KeySet`] behind an `ArcSwap` so verifications always
//!   observe a complete set
//! - Refresh remote sources periodically and on demand (unknown kid)
//! - Coalesce concurrent refresh attempts to a single fetch
//!
//! # Design Decisions
//! - Refresh replaces the whole set atomically; no partial updates
//! - A failed refresh keeps the previous set; verification then fails closed
//! - On-demand refreshes are rate limited by a cooldown so an unknown-kid
//!   storm cannot amplify traffic toward the identity provider

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use rand::Rng;
use tokio::sync::Semaphore;
use url::Url;

use crate::keys::jwks::{fetch_jwk_set, load_jwks_file, KeySet, KeySourceError};
use crate::observability::metrics;

/// Where keys come from.
enum Provider {
    /// Static local JWKS file; loaded once, never refreshed.
    Static,
    /// Remote JWKS endpoint, refreshed periodically and on demand.
    Remote(RemoteProvider),
}

struct RemoteProvider {
    client: reqwest::Client,
    jwks_uri: Url,
    cooldown: Duration,
}

/// Shared source of verification keys.
pub struct KeySource {
    current: ArcSwap<KeySet>,
    provider: Provider,
    /// Single permit: at most one in-flight refresh process-wide.
    refresh_gate: Semaphore,
}

impl KeySource {
    /// Build a static key source from a local JWKS file.
    pub fn from_file(path: &Path) -> Result<Self, KeySourceError> {
        let set = load_jwks_file(path)?;
        tracing::info!(path = %path.display(), keys = set.len(), "Loaded static JWKS");
        Ok(Self {
            current: ArcSwap::from_pointee(set),
            provider: Provider::Static,
            refresh_gate: Semaphore::new(1),
        })
    }

    /// Build a remote key source, performing the initial fetch.
    ///
    /// The initial fetch is not optional: a gate holding zero keys would
    /// reject every request, so startup fails instead.
    pub async fn remote(
        client: reqwest::Client,
        jwks_uri: Url,
        cooldown: Duration,
    ) -> Result<Self, KeySourceError> {
        let jwks = fetch_jwk_set(&client, &jwks_uri).await?;
        let set = KeySet::from_jwk_set(&jwks)?;
        tracing::info!(jwks_uri = %jwks_uri, keys = set.len(), "Fetched initial JWKS");

        Ok(Self {
            current: ArcSwap::from_pointee(set),
            provider: Provider::Remote(RemoteProvider {
                client,
                jwks_uri,
                cooldown,
            }),
            refresh_gate: Semaphore::new(1),
        })
    }

    /// Get the current key set.
    pub fn current(&self) -> Arc<KeySet> {
        self.current.load_full()
    }

    /// Refresh the key set from the provider, returning the set to verify
    /// against afterwards.
    ///
    /// Concurrent callers coalesce: one performs the fetch, the rest wait on
    /// the permit and then read the freshly swapped set. Within the cooldown
    /// window the current set is returned without fetching.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, KeySourceError> {
        let remote = match &self.provider {
            Provider::Static => return Ok(self.current()),
            Provider::Remote(r) => r,
        };

        let before = self.current();

        let _permit = match self.refresh_gate.acquire().await {
            Ok(permit) => permit,
            // Semaphore is never closed; be conservative if it somehow is.
            Err(_) => return Ok(self.current()),
        };

        // Another caller may have completed a refresh while we waited.
        let current = self.current();
        if !Arc::ptr_eq(&before, &current) {
            return Ok(current);
        }

        if current.fetched_at().elapsed() < remote.cooldown {
            tracing::debug!("Key refresh skipped, within cooldown");
            return Ok(current);
        }

        match fetch_jwk_set(&remote.client, &remote.jwks_uri).await {
            Ok(jwks) => match KeySet::from_jwk_set(&jwks) {
                Ok(set) => {
                    let set = Arc::new(set);
                    self.current.store(set.clone());
                    metrics::record_key_refresh("ok");
                    tracing::info!(keys = set.len(), "Key set refreshed");
                    Ok(set)
                }
                Err(e) => {
                    metrics::record_key_refresh("decode_error");
                    tracing::warn!(error = %e, "Refresh returned unusable JWKS, keeping current set");
                    Err(e)
                }
            },
            Err(e) => {
                metrics::record_key_refresh("fetch_error");
                tracing::warn!(error = %e, "Key refresh failed, keeping current set");
                Err(e)
            }
        }
    }

    /// Whether this source can refresh at runtime.
    pub fn is_remote(&self) -> bool {
        matches!(self.provider, Provider::Remote(_))
    }

    /// Spawn the periodic background refresh task for remote sources.
    ///
    /// The task stops when the shutdown signal fires. A small jitter is
    /// applied to the interval so a fleet of gates does not fetch in lockstep.
    pub fn spawn_refresh_task(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: tokio::sync::broadcast::Receiver<()>,
    ) {
        if !self.is_remote() {
            return;
        }

        let source = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let jitter_ms = rand::thread_rng().gen_range(0..=interval.as_millis() as u64 / 10);
                let sleep = interval + Duration::from_millis(jitter_ms);

                tokio::select! {
                    _ = tokio::time::sleep(sleep) => {
                        if let Err(e) = source.refresh().await {
                            tracing::warn!(error = %e, "Periodic key refresh failed");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Key refresh task stopping");
                        break;
                    }
                }
            }
        });
    }
}
