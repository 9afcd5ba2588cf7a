//! Startup snapshot behavior: build pass, consumption, and degradation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use token_gate::config::GateConfig;
use token_gate::lifecycle::bootstrap;
use token_gate::precompute::{build_snapshot, config_fingerprint, Snapshot, KEY_JWKS_URI};

mod common;
use common::{jwks_json, mint_token, unix_now, MockIdp, TEST_ISSUER};

/// Mock IdP whose discovery endpoint can be switched off, leaving only the
/// JWKS endpoint itself reachable.
async fn start_idp(discovery_enabled: Arc<AtomicBool>) -> MockIdp {
    let jwks_body = Arc::new(RwLock::new(jwks_json("kid-a")));
    let url_slot: Arc<OnceLock<String>> = Arc::new(OnceLock::new());
    let slot = url_slot.clone();

    let idp = MockIdp::start(move |path| match path {
        "/.well-known/openid-configuration" => {
            if !discovery_enabled.load(Ordering::SeqCst) {
                return (404, "{}".to_string());
            }
            let base = slot.get().cloned().unwrap_or_default();
            (
                200,
                serde_json::json!({ "jwks_uri": format!("{}/keys", base) }).to_string(),
            )
        }
        "/keys" => (200, jwks_body.read().unwrap().clone()),
        _ => (404, "{}".to_string()),
    })
    .await;

    url_slot.set(idp.url()).unwrap();
    idp
}

fn remote_config(issuer_url: &str, snapshot_path: Option<String>) -> GateConfig {
    let mut config = GateConfig::default();
    config.security.allowed_issuers = vec![TEST_ISSUER.to_string()];
    config.security.issuer_url = Some(issuer_url.to_string());
    config.security.refresh_timeout_secs = 2;
    config.precompute.snapshot_path = snapshot_path;
    config
}

fn temp_snapshot_path(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("token-gate-tests");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[tokio::test]
async fn build_pass_resolves_discovery_into_the_snapshot() {
    let discovery = Arc::new(AtomicBool::new(true));
    let idp = start_idp(discovery).await;

    let config = remote_config(&idp.url(), None);
    let snapshot = build_snapshot(&config).await.unwrap();

    assert_eq!(
        snapshot.get(KEY_JWKS_URI),
        Some(format!("{}/keys", idp.url()).as_str())
    );

    idp.stop();
}

#[tokio::test]
async fn bootstrap_consumes_snapshot_and_skips_discovery() {
    let discovery = Arc::new(AtomicBool::new(true));
    let idp = start_idp(discovery.clone()).await;

    let path = temp_snapshot_path("consumed.json");
    let config = remote_config(&idp.url(), Some(path.display().to_string()));

    let snapshot = build_snapshot(&config).await.unwrap();
    snapshot.save(&path).unwrap();

    // Discovery goes dark; only the resolved JWKS endpoint still answers.
    discovery.store(false, Ordering::SeqCst);

    let app = bootstrap(&config).await.expect("snapshot should carry startup");
    let token = mint_token("kid-a", "alice", TEST_ISSUER, unix_now() + 300);
    let authorized = app.gate.verify(&token).await.unwrap();
    assert_eq!(authorized.subject, "alice");

    std::fs::remove_file(&path).unwrap_or_default();
    idp.stop();
}

#[tokio::test]
async fn mismatched_snapshot_is_ignored_and_values_recomputed() {
    let discovery = Arc::new(AtomicBool::new(true));
    let idp = start_idp(discovery).await;

    let path = temp_snapshot_path("mismatched.json");
    let config = remote_config(&idp.url(), Some(path.display().to_string()));

    let snapshot = build_snapshot(&config).await.unwrap();
    snapshot.save(&path).unwrap();

    // A different issuer URL invalidates the fingerprint.
    let mut changed = config.clone();
    changed.security.issuer_url = Some(format!("{}/", idp.url()));
    assert!(Snapshot::load(&path, &config_fingerprint(&changed)).is_none());

    // Bootstrap with the changed config still works by recomputing.
    assert!(bootstrap(&changed).await.is_ok());

    std::fs::remove_file(&path).unwrap_or_default();
    idp.stop();
}

#[tokio::test]
async fn absent_snapshot_changes_nothing() {
    let discovery = Arc::new(AtomicBool::new(true));
    let idp = start_idp(discovery).await;

    let path = temp_snapshot_path("never-built.json");
    std::fs::remove_file(&path).unwrap_or_default();

    let config = remote_config(&idp.url(), Some(path.display().to_string()));
    let app = bootstrap(&config).await.expect("recompute path");

    let token = mint_token("kid-a", "alice", TEST_ISSUER, unix_now() + 300);
    assert!(app.gate.verify(&token).await.is_ok());

    idp.stop();
}
