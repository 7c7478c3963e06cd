//! HTTP facade
//! One axum listener serves the JSON endpoints, the realtime channel and the
//! UI assets.
//!
//! Features:
//! - `GET /api/projects` and `/api/projects/installed` list the snapshot as
//!   written by the scanner
//! - `GET /api/running` lists live processes
//! - `GET|POST /api/reload` re-reads the snapshot, keeping the old one on
//!   failure
//! - `/ws` upgrades to the realtime channel
//! - Anything else is a static asset, `/` maps to `index.html`
//! - Graceful shutdown stops every live process before returning

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::AssetError;
use crate::process::{ProcessRegistry, Supervisor};
use crate::projects::ProjectRegistry;
use crate::state::AppState;
use crate::websocket::{self, ConnectionHub};

/// Routes: JSON endpoints under /api, the realtime channel on /ws, static
/// assets for everything else
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/projects", get(list_projects))
        .route("/api/projects/installed", get(list_installed))
        .route("/api/running", get(list_running))
        .route("/api/reload", get(reload_projects).post(reload_projects))
        .route("/ws", get(websocket::ws_handler))
        .fallback(static_asset)
        .with_state(state)
}

/// Binds, serves until `shutdown` resolves, then stops every live process
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.listen_addr()?).await?;
    serve_on(listener, config, shutdown).await
}

pub async fn serve_on<F>(listener: TcpListener, config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let projects = Arc::new(ProjectRegistry::open(&config.projects_file));
    if projects.is_empty() {
        warn!("No projects available from {:?}", config.projects_file);
    } else {
        info!("{} projects available", projects.len());
    }
    let hub = ConnectionHub::new();
    let supervisor = Supervisor::new(
        ProcessRegistry::new(),
        config.supervisor.clone(),
        projects.clone(),
        hub.clone(),
    );
    let (supervisor, supervisor_task) = supervisor.spawn();

    let state = AppState::new(projects, supervisor.clone(), hub, config.static_dir.clone());
    let app = build_router(state);

    info!("Server listening on: {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    supervisor.shutdown().await;
    if let Err(e) = supervisor_task.await {
        error!("Supervisor task ended abnormally: {}", e);
    }
    Ok(())
}

async fn list_projects(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.projects().projects().to_vec())
}

async fn list_installed(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.projects().with_dependencies())
}

async fn list_running(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.supervisor().running().await)
}

async fn reload_projects(State(state): State<AppState>) -> Response {
    let projects = state.projects().clone();
    let result = tokio::task::spawn_blocking(move || projects.reload()).await;
    match result {
        Ok(Ok(count)) => Json(json!({ "count": count })).into_response(),
        Ok(Err(e)) => {
            warn!("Reload failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Reload task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn static_asset(State(state): State<AppState>, uri: Uri) -> Response {
    match read_asset(state.static_dir(), uri.path()).await {
        Ok((body, content_type)) => ([(header::CONTENT_TYPE, content_type)], body).into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for AssetError {
    fn into_response(self) -> Response {
        let status = match &self {
            AssetError::NotFound => StatusCode::NOT_FOUND,
            AssetError::Read(e) => {
                error!("Static asset read failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, [(header::CONTENT_TYPE, "text/plain")], self.to_string()).into_response()
    }
}

async fn read_asset(root: &Path, request_path: &str) -> Result<(Vec<u8>, &'static str), AssetError> {
    let file = resolve_asset_path(root, request_path).ok_or(AssetError::NotFound)?;
    match tokio::fs::read(&file).await {
        Ok(body) => Ok((body, content_type(&file))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AssetError::NotFound),
        Err(e) => Err(AssetError::Read(e)),
    }
}

/// Maps a request path onto the asset root, `/` to `index.html`. Paths that
/// would leave the root resolve to nothing.
fn resolve_asset_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = request_path.trim_start_matches('/');
    let relative = if relative.is_empty() { "index.html" } else { relative };

    let mut resolved = root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        _ => "text/plain",
    }
}
