//! HTTP surface over the pipeline controller, recalc engine, and job
//! runtime. One `build_app` assembles every route; `AppState` carries the
//! collaborators each handler needs.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, PlaceholderSpreadsheetDriver, MAX_UPLOAD_BYTES};

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[must_use]
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/v1/projects", post(routes::projects::create_project).get(routes::projects::list_projects))
        .route("/v1/projects/{id}", get(routes::projects::get_project))
        .route("/v1/projects/{id}/state", get(routes::projects::get_project_state))
        .route("/v1/projects/{id}/edits", post(routes::projects::save_edit))
        .route("/v1/projects/{id}/history", get(routes::projects::get_history))
        .route("/v1/documents/upload", post(routes::projects::upload_document))
        .route("/v1/phase1/scan", post(routes::phases::phase1_scan))
        .route("/v1/phase2/analyze", post(routes::phases::phase2_analyze))
        .route("/v1/phase3/map", post(routes::phases::phase3_map))
        .route("/v1/phase4/design", post(routes::phases::phase4_design))
        .route("/v1/phase5/extract", post(routes::phases::phase5_extract))
        .route("/v1/jobs/{id}", get(routes::phases::get_job))
        .route("/v1/recalc", post(routes::recalc::recalc_project))
        .route("/v1/export/excel", post(routes::export::export_excel))
        .route("/v1/export/download/{job_id}", get(routes::export::download_export))
        .route("/v1/admin/auth", post(routes::admin::auth))
        .route("/v1/admin/prompts", post(routes::admin::save_prompt))
        .route("/v1/admin/prompts/activate", post(routes::admin::activate_prompt))
        .route("/v1/admin/prompts/reset", post(routes::admin::reset_prompt))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
