//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the gate middleware in front of all handlers
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve plain TCP or TLS depending on configuration
//! - Drain in-flight requests on graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    middleware,
    routing::{any, get},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{gate_middleware, AuthorizedRequest, Gate, GateState};
use crate::config::GateConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};

/// HTTP server for the token gate.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and gate.
    pub fn new(config: &GateConfig, gate: Arc<Gate>) -> Self {
        let state = GateState { gate };
        let router = Self::build_router(config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// `/healthz` stays outside the gate so liveness probes need no token;
    /// everything else is protected. In-flight requests are capped at
    /// `listener.max_connections`; excess requests queue inside the request
    /// timeout rather than being dropped.
    fn build_router(config: &GateConfig, state: GateState) -> Router {
        let protected = Router::new()
            .route("/", any(authorized_handler))
            .route("/{*path}", any(authorized_handler))
            .route_layer(middleware::from_fn_with_state(state, gate_middleware));

        Router::new()
            .route("/healthz", get(health_handler))
            .merge(protected)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(propagate_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    )))
                    .layer(GlobalConcurrencyLimitLayer::new(
                        config.listener.max_connections,
                    )),
            )
    }

    /// Run the server on a plain TCP listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS until shutdown.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let drain_handle = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Draining connections");
            drain_handle.graceful_shutdown(Some(Duration::from_secs(30)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Handler behind the gate.
///
/// What runs after authorization is deliberately undefined; this returns the
/// authorized identity so the gate has an observable success path.
async fn authorized_handler(Extension(auth): Extension<AuthorizedRequest>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "subject": auth.subject,
        "issuer": auth.issuer,
    }))
}

/// Unauthenticated liveness probe.
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
