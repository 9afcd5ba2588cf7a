//! Startup orchestration.
//!
//! # Responsibilities
//! - Consume the startup snapshot when one is present and valid
//! - Initialize the key source (static file or remote fetch)
//! - Construct the security gate
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal; a half-configured gate is unsafe
//!   to run, so there are no retries at this layer
//! - Subsystems initialize in order; the listener binds last (in main)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::auth::Gate;
use crate::config::GateConfig;
use crate::keys::{resolve_jwks_uri, KeySource, KeySourceError};
use crate::precompute::{config_fingerprint, deduce_environment, Snapshot, KEY_ENVIRONMENT, KEY_JWKS_URI};

/// Fatal startup failure.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("key source initialization failed: {0}")]
    Keys(#[from] KeySourceError),

    #[error("HTTP client initialization failed: {0}")]
    Client(reqwest::Error),
}

/// Fully wired application state, ready to serve.
pub struct App {
    pub gate: Arc<Gate>,
    pub keys: Arc<KeySource>,
    pub environment: String,
}

/// Wire the gate from a validated configuration.
///
/// Consults the startup snapshot first; every snapshot entry has a direct
/// recomputation fallback, so a missing or stale snapshot only costs time.
pub async fn bootstrap(config: &GateConfig) -> Result<App, StartupError> {
    let snapshot = load_snapshot(config);

    let environment = snapshot
        .as_ref()
        .and_then(|s| s.get(KEY_ENVIRONMENT).map(str::to_string))
        .unwrap_or_else(deduce_environment);
    tracing::info!(environment = %environment, "Effective environment");

    let keys = init_key_source(config, snapshot.as_ref()).await?;
    let gate = Arc::new(Gate::new(keys.clone(), &config.security));

    Ok(App {
        gate,
        keys,
        environment,
    })
}

fn load_snapshot(config: &GateConfig) -> Option<Snapshot> {
    let path = config.precompute.snapshot_path.as_ref()?;
    let fingerprint = config_fingerprint(config);
    Snapshot::load(Path::new(path), &fingerprint)
}

/// Initialize the key source per configuration.
///
/// For remote sources the snapshot can supply the resolved JWKS endpoint,
/// skipping the discovery round trip. The initial key fetch itself is never
/// skipped: the gate must hold verification keys before serving.
async fn init_key_source(
    config: &GateConfig,
    snapshot: Option<&Snapshot>,
) -> Result<Arc<KeySource>, StartupError> {
    if let Some(path) = &config.security.jwks_path {
        let source = KeySource::from_file(Path::new(path))?;
        return Ok(Arc::new(source));
    }

    let security = &config.security;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(security.refresh_timeout_secs))
        .build()
        .map_err(StartupError::Client)?;

    let precomputed_uri = snapshot
        .and_then(|s| s.get(KEY_JWKS_URI))
        .and_then(|raw| match Url::parse(raw) {
            Ok(uri) => Some(uri),
            Err(e) => {
                tracing::warn!(error = %e, "Snapshot jwks_uri unparsable, resolving directly");
                None
            }
        });

    let jwks_uri = match precomputed_uri {
        Some(uri) => {
            tracing::info!(jwks_uri = %uri, "JWKS endpoint taken from startup snapshot");
            uri
        }
        None => resolve_jwks_uri(&client, security).await?,
    };

    let source = KeySource::remote(
        client,
        jwks_uri,
        Duration::from_secs(security.refresh_cooldown_secs),
    )
    .await?;

    Ok(Arc::new(source))
}
