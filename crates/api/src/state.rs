use std::path::PathBuf;
use std::sync::Arc;

use stemsplit_pipeline::Orchestrator;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Job submission and status lookups.
    pub orchestrator: Arc<Orchestrator>,
    /// Directory served under `/files` when the local storage backend is active.
    pub files_dir: Option<PathBuf>,
}
