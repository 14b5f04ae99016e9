use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stemsplit_api::config::ServerConfig;
use stemsplit_api::router::build_app_router;
use stemsplit_api::state::AppState;
use stemsplit_cloud::{ArtifactPublisher, LocalStore, ObjectStore, S3Store, StorageConfig};
use stemsplit_core::separation::SeparationEngine;
use stemsplit_pipeline::{Orchestrator, PipelineConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stemsplit_api=debug,stemsplit_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid server configuration");
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let pipeline = PipelineConfig::from_env().expect("Invalid pipeline configuration");
    let storage = StorageConfig::from_env().expect("Invalid storage configuration");

    // --- Storage ---
    let files_dir = match &storage {
        StorageConfig::Local(local) => Some(local.root.clone()),
        StorageConfig::S3(_) => None,
    };
    let store = open_store(&storage).await;

    // --- Separation pipeline ---
    let engine = pipeline.engine();
    tracing::info!(
        program = %engine.program(),
        model = %engine.model(),
        max_concurrent_jobs = pipeline.max_concurrent_jobs,
        workspace_root = %pipeline.workspace_root.display(),
        "Separation pipeline configured",
    );
    let publisher = ArtifactPublisher::new(store, storage.public_base());
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(engine),
        publisher,
        &pipeline.workspace_root,
        pipeline.max_concurrent_jobs,
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        orchestrator: Arc::clone(&orchestrator),
        files_dir,
    };

    let app = build_app_router(state, &config);

    // --- Serve ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Stem separation API listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Drain background jobs ---
    tracing::info!(
        in_flight = orchestrator.in_flight(),
        "HTTP server stopped, draining separation jobs",
    );

    let drained = orchestrator
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    if drained {
        tracing::info!("All jobs drained");
    } else {
        tracing::warn!(
            in_flight = orchestrator.in_flight(),
            "Shutdown timeout elapsed with jobs still running",
        );
    }
}

/// Build the object store selected by `STORAGE_BACKEND`.
async fn open_store(storage: &StorageConfig) -> Arc<dyn ObjectStore> {
    let store: Arc<dyn ObjectStore> = match storage {
        StorageConfig::S3(s3) => Arc::new(S3Store::connect(s3).await),
        StorageConfig::Local(local) => {
            tokio::fs::create_dir_all(&local.root)
                .await
                .expect("Failed to create LOCAL_STORAGE_PATH");
            Arc::new(LocalStore::new(&local.root))
        }
    };
    tracing::info!(
        backend = storage.backend_name(),
        public_base = %storage.public_base(),
        "Object store ready",
    );
    store
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
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
        () = ctrl_c => {
            tracing::info!("SIGINT received, shutting down");
        }
        () = terminate => {
            tracing::info!("SIGTERM received, shutting down");
        }
    }
}
