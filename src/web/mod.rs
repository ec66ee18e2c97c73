//! HTTP surface: the dashboard page, its JSON views, manual refresh and diagnostics.

use crate::config::Settings;
use crate::dashboard::{DashboardHandle, DashboardState};
use crate::diagnostics::{self, DiagnosticReport};
use crate::repository::SnapshotRepository;
use crate::view::{render_dashboard, render_diagnostics, DashboardView, PageOptions};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub dashboard: DashboardHandle,
    pub repo: Arc<dyn SnapshotRepository>,
    pub settings: Arc<Settings>,
    pub page: Arc<PageOptions>,
}

impl AppState {
    pub fn new(dashboard: DashboardHandle, repo: Arc<dyn SnapshotRepository>, settings: Settings) -> Self {
        let page = PageOptions::from_settings(&settings);
        Self {
            dashboard,
            repo,
            settings: Arc::new(settings),
            page: Arc::new(page),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/state", get(api_state))
        .route("/api/view", get(api_view))
        .route("/refresh", post(refresh))
        .route("/test", get(test_page))
        .route("/api/diagnostics", get(api_diagnostics))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(url = %format!("http://{addr}"), "Dashboard listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index(State(st): State<AppState>) -> Html<String> {
    let state = st.dashboard.state();
    Html(render_dashboard(&state, &st.page))
}

async fn api_state(State(st): State<AppState>) -> Json<DashboardState> {
    Json(DashboardState::clone(&st.dashboard.state()))
}

async fn api_view(State(st): State<AppState>) -> Json<DashboardView> {
    Json(DashboardView::build(&st.dashboard.state(), &st.page))
}

async fn refresh(State(st): State<AppState>) -> Response {
    if st.dashboard.refresh().await {
        Redirect::to("/").into_response()
    } else {
        warn!("Refresh requested after dashboard stopped");
        (StatusCode::SERVICE_UNAVAILABLE, "dashboard stopped").into_response()
    }
}

async fn diagnose(st: &AppState) -> DiagnosticReport {
    DiagnosticReport {
        env_vars: diagnostics::env_report(&st.settings),
        query: diagnostics::probe_with(st.repo.as_ref()).await,
    }
}

async fn test_page(State(st): State<AppState>) -> Html<String> {
    Html(render_diagnostics(&diagnose(&st).await))
}

async fn api_diagnostics(State(st): State<AppState>) -> Json<DiagnosticReport> {
    Json(diagnose(&st).await)
}

async fn health(State(st): State<AppState>) -> impl IntoResponse {
    let state = st.dashboard.state();
    Json(json!({
        "status": "ok",
        "window_len": state.window.len(),
        "has_latest": state.latest.is_some(),
        "loading": state.loading,
        "last_update": state.last_update,
    }))
}
