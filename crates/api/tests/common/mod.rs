#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use stemsplit_api::config::ServerConfig;
use stemsplit_api::router::build_app_router;
use stemsplit_api::state::AppState;
use stemsplit_cloud::{ArtifactPublisher, LocalStore};
use stemsplit_core::separation::{ExitInfo, RunOutcome, SeparationEngine, SeparationError};
use stemsplit_core::stems::Stem;
use stemsplit_pipeline::Orchestrator;

pub const PUBLIC_BASE: &str = "http://localhost:3000/files";
const BOUNDARY: &str = "stemsplit-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        max_upload_bytes: 1024 * 1024,
    }
}

// ---------------------------------------------------------------------------
// Fake engines
// ---------------------------------------------------------------------------

/// Succeeds, leaving four placeholder stems in the expected layout.
pub struct PlaceholderEngine;

#[async_trait]
impl SeparationEngine for PlaceholderEngine {
    fn model(&self) -> &str {
        "htdemucs_ft"
    }

    async fn run(&self, input: &Path, output_dir: &Path) -> Result<RunOutcome, SeparationError> {
        let dir = self.stems_dir(input, output_dir);
        std::fs::create_dir_all(&dir)?;
        for stem in Stem::ALL {
            std::fs::write(dir.join(stem.file_name()), b"RIFF")?;
        }
        Ok(RunOutcome::Success)
    }
}

/// Exits non-zero.
pub struct FailingEngine;

#[async_trait]
impl SeparationEngine for FailingEngine {
    fn model(&self) -> &str {
        "htdemucs_ft"
    }

    async fn run(&self, _input: &Path, _output_dir: &Path) -> Result<RunOutcome, SeparationError> {
        Ok(RunOutcome::EngineFailure(ExitInfo {
            exit_code: Some(1),
            timed_out: false,
            stderr_tail: "RuntimeError: CUDA out of memory".into(),
            duration_ms: 5,
        }))
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// A router over a local-disk store, plus the directories it uses.
pub struct TestApp {
    pub router: Router,
    pub orchestrator: Arc<Orchestrator>,
    pub workspaces: TempDir,
    pub files: TempDir,
}

pub fn build_test_app(engine: Arc<dyn SeparationEngine>) -> TestApp {
    build_test_app_with(engine, test_config())
}

/// Build the full application router with all middleware layers, backed
/// by the local object store so `/files` serves the published stems.
pub fn build_test_app_with(engine: Arc<dyn SeparationEngine>, config: ServerConfig) -> TestApp {
    let workspaces = TempDir::new().unwrap();
    let root = workspaces.path().to_path_buf();
    assemble(engine, config, workspaces, &root)
}

/// Like [`build_test_app`], but jobs are staged under `workspace_root`.
pub fn build_test_app_at(engine: Arc<dyn SeparationEngine>, workspace_root: &Path) -> TestApp {
    assemble(engine, test_config(), TempDir::new().unwrap(), workspace_root)
}

fn assemble(
    engine: Arc<dyn SeparationEngine>,
    config: ServerConfig,
    workspaces: TempDir,
    workspace_root: &Path,
) -> TestApp {
    let files = TempDir::new().unwrap();

    let publisher = ArtifactPublisher::new(Arc::new(LocalStore::new(files.path())), PUBLIC_BASE);
    let orchestrator = Arc::new(Orchestrator::new(engine, publisher, workspace_root, 2));

    let state = AppState {
        config: Arc::new(config.clone()),
        orchestrator: Arc::clone(&orchestrator),
        files_dir: Some(files.path().to_path_buf()),
    };

    TestApp {
        router: build_app_router(state, &config),
        orchestrator,
        workspaces,
        files,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Build a multipart body with a single file part.
pub fn multipart_body(field: &str, file_name: Option<&str>, bytes: &[u8]) -> Vec<u8> {
    let disposition = match file_name {
        Some(name) => format!("form-data; name=\"{field}\"; filename=\"{name}\""),
        None => format!("form-data; name=\"{field}\""),
    };
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\nContent-Type: audio/wav\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn post_multipart(app: &Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Upload `bytes` as `file_name` to the submit endpoint.
pub async fn submit(app: &Router, file_name: &str, bytes: &[u8]) -> Response<Body> {
    post_multipart(app, "/api/v1/jobs", multipart_body("file", Some(file_name), bytes)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Poll `GET /api/v1/jobs/{id}` until the job is terminal.
pub async fn wait_terminal(app: &Router, id: &str) -> serde_json::Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let json = body_json(get(app, &format!("/api/v1/jobs/{id}")).await).await;
        let status = json["data"]["status"].as_str().unwrap_or_default().to_string();
        if status == "done" || status == "error" {
            return json["data"].clone();
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} stuck in {status}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
