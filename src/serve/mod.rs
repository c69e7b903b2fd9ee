//! HTTP front end: pages from the live index set, a refresh hook and a health
//! endpoint. Handlers only ever read the published snapshot.

pub mod layout;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{FikiError, Result};
use crate::ingest::entry::{normalize_path, split_parent};
use crate::ingest::{IndexSet, IngestionCoordinator};

/// Key of the root page
pub const ROOT_PAGE: &str = "index";

/// A page resolved against an index set, ready for the layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub title: String,
    pub path: String,
    pub body: String,
    pub breadcrumb: Vec<String>,
}

/// Cumulative parent directories of a path: `a/b/c` → `["a", "a/b"]`
pub fn breadcrumb(path: &str) -> Vec<String> {
    let (parent, _) = split_parent(path);
    if parent.is_empty() {
        return Vec::new();
    }

    let segments: Vec<&str> = parent.split('/').collect();
    (1..=segments.len())
        .map(|i| segments[..i].join("/"))
        .collect()
}

/// Resolve a request path.
///
/// A page key wins. Otherwise the path is treated as a directory: its
/// `index` page (if any) plus its child listing. `None` when neither exists.
pub fn resolve(index: &IndexSet, path: &str) -> Option<PageView> {
    let mut path = normalize_path(path);
    if path.is_empty() {
        path = ROOT_PAGE.to_string();
    }

    let body = match index.lookup_page(&path) {
        Some(html) => html.to_string(),
        None => {
            let dir_page = index.lookup_page(&format!("{}/{}", path, ROOT_PAGE));
            if dir_page.is_none() && !index.has_children(&path) {
                return None;
            }
            layout::directory_body(&path, dir_page.unwrap_or(""), index.children_of(&path))
        }
    };

    let (_, title) = split_parent(&path);
    Some(PageView {
        title: title.to_string(),
        breadcrumb: breadcrumb(&path),
        path,
        body,
    })
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    coordinator: Arc<IngestionCoordinator>,
}

/// Build the router. `refresh_path` triggers a background pass.
pub fn router(coordinator: Arc<IngestionCoordinator>, refresh_path: &str) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/_health", get(handle_health))
        .route(refresh_path, any(handle_refresh))
        .route("/*path", get(handle_page))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(log_request)),
        )
        .with_state(AppState { coordinator })
}

/// HTTP server wrapper
pub struct WikiServer {
    coordinator: Arc<IngestionCoordinator>,
    config: Config,
}

impl WikiServer {
    pub fn new(coordinator: Arc<IngestionCoordinator>, config: Config) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Bind and serve until the process exits
    pub async fn run(&self) -> Result<()> {
        let app = router(
            Arc::clone(&self.coordinator),
            &self.config.http_server.refresh_path,
        );

        let addr = self.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| FikiError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

        log::info!("start listening at {}", addr);
        log::info!(
            "refresh hook: http://{}{}",
            addr,
            self.config.http_server.refresh_path
        );

        axum::serve(listener, app)
            .await
            .map_err(|e| FikiError::Server(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;
    log::info!(
        "{} {} {} took: {:?}",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}

async fn handle_root(State(state): State<AppState>) -> Response {
    render_path(&state, "")
}

async fn handle_page(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    render_path(&state, &path)
}

fn render_path(state: &AppState, path: &str) -> Response {
    let index = state.coordinator.live().load();
    match resolve(&index, path) {
        Some(view) => Html(layout::render_document(&view, &index)).into_response(),
        None => (StatusCode::NOT_FOUND, Html(layout::not_found(path))).into_response(),
    }
}

/// Acknowledge at once; the pass runs in the background
async fn handle_refresh(State(state): State<AppState>) -> StatusCode {
    log::info!("Refresh requested");
    state.coordinator.spawn_refresh();
    StatusCode::OK
}

async fn handle_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let live = state.coordinator.live();
    let index = live.load();

    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "generation": live.generation(),
        "pages": index.page_count(),
        "topics": index.topics(),
        "state": state.coordinator.state(),
        "last_pass": state.coordinator.last_report(),
    }))
}
