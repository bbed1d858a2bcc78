//! Phase dispatch: Phase 1 runs synchronously, Phases 2-5 are dispatched
//! as jobs, and `/v1/jobs/{id}` polls any of them.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use modelforge_engine::DispatchOptions;
use modelforge_utils::types::PhaseId;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PhaseRequest {
    pub project_id: Uuid,
    #[serde(default)]
    pub edits: Value,
}

pub async fn phase1_scan(State(state): State<Arc<AppState>>, Json(body): Json<Phase1Request>) -> Result<Json<Value>, ApiError> {
    let project = state.store.get_project(body.project_id).await.map_err(|_| ApiError::project_not_found(body.project_id))?;
    state.store.get_document(body.document_id).await.map_err(|_| ApiError::document_not_found(body.document_id))?;

    let needs_new_run = match project.active_run_id {
        Some(run_id) => state.store.get_run(run_id).await?.document_id != body.document_id,
        None => true,
    };
    if needs_new_run {
        let run = state.store.create_run(project.id, body.document_id).await?;
        state.store.set_active_run(project.id, run.id).await?;
    }

    let options = DispatchOptions { estimation_mode: false, strict_extraction: state.config.strict_extraction, edits: body.edits };
    let result = state.controller.dispatch_phase(project.id, PhaseId::Phase1, options).await?;
    Ok(Json(json!(result)))
}

#[derive(Debug, Deserialize)]
pub struct Phase1Request {
    pub project_id: Uuid,
    pub document_id: Uuid,
    #[serde(default)]
    pub edits: Value,
}

async fn dispatch_async_phase(state: &AppState, phase: PhaseId, body: PhaseRequest) -> Result<(StatusCode, Json<Value>), ApiError> {
    let options = DispatchOptions { estimation_mode: false, strict_extraction: state.config.strict_extraction, edits: body.edits };
    let result = state.controller.dispatch_phase(body.project_id, phase, options).await?;
    let poll_url = result.job_id.map(|id| format!("/v1/jobs/{id}"));
    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": result.job_id, "status": result.status, "phase": result.phase, "poll_url": poll_url }))))
}

pub async fn phase2_analyze(State(state): State<Arc<AppState>>, Json(body): Json<PhaseRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    dispatch_async_phase(&state, PhaseId::Phase2, body).await
}

pub async fn phase3_map(State(state): State<Arc<AppState>>, Json(body): Json<PhaseRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    dispatch_async_phase(&state, PhaseId::Phase3, body).await
}

pub async fn phase5_extract(State(state): State<Arc<AppState>>, Json(body): Json<PhaseRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    dispatch_async_phase(&state, PhaseId::Phase5, body).await
}

#[derive(Debug, Deserialize)]
pub struct Phase4Request {
    pub project_id: Uuid,
    #[serde(default)]
    pub allow_estimation: bool,
    #[serde(default)]
    pub edits: Value,
}

/// Phase 4 needs a completed, non-empty Phase 3 mapping unless the caller
/// opts into estimation mode, which lets the design agent invent a
/// baseline shape instead of erroring out.
pub async fn phase4_design(State(state): State<Arc<AppState>>, Json(body): Json<Phase4Request>) -> Result<(StatusCode, Json<Value>), ApiError> {
    let project = state.store.get_project(body.project_id).await.map_err(|_| ApiError::project_not_found(body.project_id))?;
    let run_id = project.active_run_id.ok_or_else(|| ApiError::validation("project has no active run"))?;

    let phase3 = state.store.get_phase_result(run_id, PhaseId::Phase3).await?.ok_or_else(ApiError::phase3_not_completed)?;
    let empty = phase3_result_is_empty(&phase3.result);
    if empty && !body.allow_estimation {
        return Err(ApiError::phase3_empty_result());
    }
    let estimation_mode = empty && body.allow_estimation;

    let options = DispatchOptions { estimation_mode, strict_extraction: state.config.strict_extraction, edits: body.edits };
    let result = state.controller.dispatch_phase(body.project_id, PhaseId::Phase4, options).await?;
    let poll_url = result.job_id.map(|id| format!("/v1/jobs/{id}"));
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job_id": result.job_id, "status": result.status, "phase": result.phase, "poll_url": poll_url, "estimation_mode": estimation_mode })),
    ))
}

fn phase3_result_is_empty(result: &Value) -> bool {
    for key in ["sheet_mappings", "segment_mapping", "sheets"] {
        if let Some(array) = result.get(key).and_then(Value::as_array) {
            if !array.is_empty() {
                return false;
            }
        }
    }
    true
}

pub async fn get_job(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let job = state.store.get_job(id).await.map_err(|_| ApiError::job_not_found(id))?;
    Ok(Json(json!(job)))
}
