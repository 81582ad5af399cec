// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, process, sync::Arc};

use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portal_session_gateway::{
    api::router,
    audit::TracingAuditSink,
    auth::{CacheSweeper, Gateway},
    config::{bind_address, VerificationConfig, LOG_FORMAT_ENV},
    state::AppState,
};

#[tokio::main]
async fn main() {
    init_tracing();

    // Resolve configuration once; a broken trust boundary never serves traffic
    let config = match VerificationConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };

    let gateway = match Gateway::from_config(Arc::clone(&config), Arc::new(TracingAuditSink)) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize session verifier");
            process::exit(1);
        }
    };

    tracing::info!(
        deployment = ?config.deployment,
        portal = %config.portal_url,
        auth_mode = %gateway.mode(),
        cache_ttl_secs = config.cache_ttl.as_secs(),
        cache_capacity = config.cache_capacity,
        api_mode = config.api_mode,
        "starting portal session gateway"
    );

    let shutdown = CancellationToken::new();

    if let Some(interval) = config.cache_sweep_interval {
        let sweeper = CacheSweeper::new(gateway.cache(), interval);
        tokio::spawn(sweeper.run(shutdown.clone()));
    }

    let app = router(AppState::new(gateway));

    let addr = match bind_address(|name| env::var(name).ok()) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(error = %e, "invalid bind address");
            process::exit(1);
        }
    };

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    tracing::info!(address = %addr, "listening (docs at /docs)");

    let server_shutdown = shutdown.clone();
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("shutdown signal received, draining connections");
            server_shutdown.cancel();
        })
        .await;

    shutdown.cancel();
    if let Err(e) = result {
        tracing::error!(error = %e, "server error");
        process::exit(1);
    }
    tracing::info!("portal session gateway stopped");
}

/// Initialize tracing from `RUST_LOG` and `LOG_FORMAT`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let json = env::var(LOG_FORMAT_ENV)
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
