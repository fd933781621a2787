mod app;
mod config;
mod routes;
mod state;

use tokio::signal;
use tracing_subscriber::EnvFilter;
use wordmap_shared::MapConfig;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let data_dir = config::data_dir();
    let dist_dir = config::dist_dir();
    let validate = config::validate_data_enabled();
    tracing::info!(
        data_dir = %data_dir.display(),
        dist_dir = %dist_dir.display(),
        validate,
        "Scanning data directory..."
    );
    if !data_dir.is_dir() {
        tracing::warn!(data_dir = %data_dir.display(), "data directory does not exist");
    }

    let scan_dir = data_dir.clone();
    let manifest = match tokio::task::spawn_blocking(move || {
        state::scan_data_dir(&scan_dir, &MapConfig::default(), validate)
    })
    .await
    {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::error!(error = %e, "data directory scan panicked");
            return;
        }
    };
    if !manifest.data_errors.is_empty() {
        tracing::warn!(
            count = manifest.data_errors.len(),
            "serving with data errors; see /api/health"
        );
    }

    let state = AppState::new(data_dir, dist_dir, manifest);
    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Word map server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
