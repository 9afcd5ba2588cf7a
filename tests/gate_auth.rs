//! End-to-end gate tests against a static local JWKS.

use std::net::SocketAddr;
use std::path::Path;

use axum::http::StatusCode;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use token_gate::config::GateConfig;
use token_gate::http::HttpServer;
use token_gate::lifecycle::{bootstrap, Shutdown};

mod common;
use common::{
    jwks_json, mint_token, mint_token_with, unix_now, write_jwks_file, ROGUE_RSA_PEM, TEST_ISSUER,
};

const KID: &str = "test-key-1";

fn static_config(jwks_path: &Path, skew_secs: u64) -> GateConfig {
    let mut config = GateConfig::default();
    config.security.allowed_issuers = vec![TEST_ISSUER.to_string()];
    config.security.jwks_path = Some(jwks_path.display().to_string());
    config.security.clock_skew_tolerance_secs = skew_secs;
    config
}

async fn start_gate(config: GateConfig) -> (SocketAddr, Shutdown) {
    let app = bootstrap(&config).await.expect("bootstrap");
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = HttpServer::new(&config, app.gate.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

#[tokio::test]
async fn valid_token_is_authorized_with_subject() {
    let jwks = write_jwks_file("gate_valid.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 30)).await;

    let token = mint_token(KID, "alice", TEST_ISSUER, unix_now() + 300);
    let res = reqwest::Client::new()
        .get(format!("http://{}/anything", addr))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["subject"], "alice");
    assert_eq!(body["issuer"], TEST_ISSUER);

    shutdown.trigger();
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let jwks = write_jwks_file("gate_expired.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 0)).await;

    let token = mint_token(KID, "alice", TEST_ISSUER, unix_now() - 10);
    let res = reqwest::Client::new()
        .get(format!("http://{}/", addr))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.text().await.unwrap(), "expired_token");

    shutdown.trigger();
}

#[tokio::test]
async fn expiry_within_skew_tolerance_is_accepted() {
    let jwks = write_jwks_file("gate_skew.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 60)).await;

    // 5 seconds past expiry, inside the 60s tolerance.
    let token = mint_token(KID, "alice", TEST_ISSUER, unix_now() - 5);
    let res = reqwest::Client::new()
        .get(format!("http://{}/", addr))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
}

#[tokio::test]
async fn missing_authorization_header_is_rejected() {
    let jwks = write_jwks_file("gate_missing.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 30)).await;

    let res = reqwest::get(format!("http://{}/", addr)).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers().get("www-authenticate").unwrap(), "Bearer");
    assert_eq!(res.text().await.unwrap(), "missing_credential");

    shutdown.trigger();
}

#[tokio::test]
async fn garbage_token_is_malformed() {
    let jwks = write_jwks_file("gate_garbage.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 30)).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}/", addr))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.text().await.unwrap(), "malformed_token");

    shutdown.trigger();
}

#[tokio::test]
async fn rogue_signature_is_rejected() {
    let jwks = write_jwks_file("gate_rogue.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 30)).await;

    // Signed with an untrusted key but claiming the trusted kid.
    let token = mint_token_with(ROGUE_RSA_PEM, KID, "mallory", TEST_ISSUER, unix_now() + 300);
    let res = reqwest::Client::new()
        .get(format!("http://{}/", addr))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.text().await.unwrap(), "invalid_signature");

    shutdown.trigger();
}

#[tokio::test]
async fn untrusted_issuer_is_rejected() {
    let jwks = write_jwks_file("gate_issuer.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 30)).await;

    let token = mint_token(KID, "alice", "https://evil.example", unix_now() + 300);
    let res = reqwest::Client::new()
        .get(format!("http://{}/", addr))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.text().await.unwrap(), "untrusted_issuer");

    shutdown.trigger();
}

#[tokio::test]
async fn unknown_kid_is_rejected_for_static_source() {
    let jwks = write_jwks_file("gate_unknown_kid.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 30)).await;

    let token = mint_token("some-other-kid", "alice", TEST_ISSUER, unix_now() + 300);
    let res = reqwest::Client::new()
        .get(format!("http://{}/", addr))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.text().await.unwrap(), "unknown_key");

    shutdown.trigger();
}

#[tokio::test]
async fn healthz_needs_no_token() {
    let jwks = write_jwks_file("gate_health.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 30)).await;

    let res = reqwest::get(format!("http://{}/healthz", addr)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mixed_requests_get_independent_verdicts() {
    let jwks = write_jwks_file("gate_concurrent.json", KID);
    let (addr, shutdown) = start_gate(static_config(&jwks, 0)).await;

    let valid = mint_token(KID, "alice", TEST_ISSUER, unix_now() + 300);
    let expired = mint_token(KID, "bob", TEST_ISSUER, unix_now() - 100);
    let client = reqwest::Client::new();

    let mut set = JoinSet::new();
    for i in 0..300 {
        let client = client.clone();
        let token = if i % 2 == 0 { valid.clone() } else { expired.clone() };
        let url = format!("http://{}/", addr);
        set.spawn(async move {
            let res = client.get(url).bearer_auth(token).send().await.unwrap();
            (i, res.status())
        });
    }

    while let Some(result) = set.join_next().await {
        let (i, status) = result.unwrap();
        if i % 2 == 0 {
            assert_eq!(status, StatusCode::OK, "valid token got wrong verdict");
        } else {
            assert_eq!(status, StatusCode::UNAUTHORIZED, "expired token got wrong verdict");
        }
    }

    shutdown.trigger();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tiny_request_limit_still_serves_every_request() {
    let jwks = write_jwks_file("gate_limit.json", KID);
    let mut config = static_config(&jwks, 0);
    // Queue nearly everything behind two in-flight slots.
    config.listener.max_connections = 2;
    let (addr, shutdown) = start_gate(config).await;

    let valid = mint_token(KID, "alice", TEST_ISSUER, unix_now() + 300);
    let expired = mint_token(KID, "bob", TEST_ISSUER, unix_now() - 100);
    let client = reqwest::Client::new();

    let mut set = JoinSet::new();
    for i in 0..100 {
        let client = client.clone();
        let token = if i % 2 == 0 { valid.clone() } else { expired.clone() };
        let url = format!("http://{}/", addr);
        set.spawn(async move {
            let res = client.get(url).bearer_auth(token).send().await.unwrap();
            (i, res.status())
        });
    }

    while let Some(result) = set.join_next().await {
        let (i, status) = result.unwrap();
        let expected = if i % 2 == 0 {
            StatusCode::OK
        } else {
            StatusCode::UNAUTHORIZED
        };
        assert_eq!(status, expected, "request {} got the wrong verdict", i);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn jwks_helper_produces_parsable_document() {
    // Guards the shared fixture itself.
    let parsed: serde_json::Value = serde_json::from_str(&jwks_json(KID)).unwrap();
    assert_eq!(parsed["keys"][0]["kid"], KID);
}
