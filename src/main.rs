// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing::info;

use vault_gateway::api::router;
use vault_gateway::chain::ChainClient;
use vault_gateway::config::{
    DATA_DIR_ENV, DEFAULT_DATA_DIR, TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV,
};
use vault_gateway::gateway::capacity::CapacityManager;
use vault_gateway::gateway::client::NodeClient;
use vault_gateway::gateway::VaultGateway;
use vault_gateway::signer::KeyMaterial;
use vault_gateway::state::AppState;
use vault_gateway::storage::{AuditLog, HistoryStore, StoragePaths};

#[tokio::main]
async fn main() {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    init_tracing();

    // Local persistence
    let data_dir = env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let paths = StoragePaths::new(&data_dir);
    let history = Arc::new(
        HistoryStore::open(&paths.history_db()).expect("Failed to open history database"),
    );
    let audit = Arc::new(AuditLog::new(paths.clone()));

    // Gateway components
    let signer = Arc::new(KeyMaterial::from_env().expect("Failed to load signing credential"));
    let network = NodeClient::from_env().expect("Failed to configure network client");
    let capacity = CapacityManager::from_env();

    info!(
        signer = %signer.address_string(),
        network = network.network_name(),
        data_dir = %data_dir,
        "Starting secret vault gateway"
    );

    let mut gateway = VaultGateway::new(network, signer, capacity, history.clone())
        .with_audit(audit.clone());
    match ChainClient::from_env() {
        Ok(Some(chain)) => {
            info!("Policy preflight enabled");
            gateway = gateway.with_preflight(chain);
        }
        Ok(None) => info!("Policy preflight disabled (no RPC endpoint configured)"),
        Err(e) => panic!("Invalid preflight RPC configuration: {e}"),
    }

    let state = AppState::new(Arc::new(gateway), history, audit);
    let app = router(state);

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let tls_paths = env::var(TLS_CERT_PATH_ENV)
        .ok()
        .zip(env::var(TLS_KEY_PATH_ENV).ok());

    match tls_paths {
        Some((cert_path, key_path)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .expect("Failed to load TLS certificate/key");

            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                let shutdown = shutdown.clone();
                async move {
                    shutdown.cancelled().await;
                    handle.graceful_shutdown(Some(Duration::from_secs(10)));
                }
            });

            info!("Secret vault gateway listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .expect("Failed to bind listen address");

            info!("Secret vault gateway listening on http://{addr} (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.clone().cancelled_owned())
                .await
                .expect("HTTP server failed");
        }
    }

    info!("Secret vault gateway stopped");
}

/// Initialize structured logging per `LOG_FORMAT` (`json` or `pretty`).
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Cancel the token on SIGINT or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    token.cancel();
}
