//! Process entry point for the token gate.
//!
//! Startup order: config → logging → metrics → snapshot + key source →
//! background refresh → listener. Any failure before the listener binds is
//! fatal and exits non-zero; a half-configured security gate must not serve.

use std::path::Path;
use std::time::Duration;

use tokio::net::TcpListener;

use token_gate::config::load_config;
use token_gate::http::HttpServer;
use token_gate::lifecycle::{bootstrap, signals, Shutdown};
use token_gate::net::load_tls_config;
use token_gate::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("GATE_CONFIG")
        .ok()
        .or_else(|| std::env::args().nth(1))
        .unwrap_or_else(|| "gate.toml".to_string());

    let config = match load_config(Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("token-gate: fatal: {}", e);
            return Err(e.into());
        }
    };

    logging::init_tracing(&config.observability.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        bind_address = %config.listener.bind_address,
        "token-gate starting"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let app = match bootstrap(&config).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "Fatal startup failure");
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    app.keys.spawn_refresh_task(
        Duration::from_secs(config.security.refresh_interval_secs),
        shutdown.subscribe(),
    );

    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(&config, app.gate.clone());

    if let Some(tls) = &config.listener.tls {
        // bind_address was validated as a SocketAddr when the config loaded
        let addr = config.listener.bind_address.parse()?;
        let tls_config =
            load_tls_config(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?;
        server.run_tls(addr, tls_config, server_shutdown).await?;
    } else {
        let listener = match TcpListener::bind(&config.listener.bind_address).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(
                    bind_address = %config.listener.bind_address,
                    error = %e,
                    "Failed to bind listener"
                );
                return Err(e.into());
            }
        };
        server.run(listener, server_shutdown).await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
