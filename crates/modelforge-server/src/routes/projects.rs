//! Project lifecycle, document upload, edit history.

use crate::error::ApiError;
use crate::state::{AppState, MAX_UPLOAD_BYTES};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use modelforge_utils::types::{Edit, PhaseId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

pub async fn create_project(State(state): State<Arc<AppState>>, Json(body): Json<CreateProjectRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::validation("project name must not be empty"));
    }
    let project = state.store.create_project(body.name).await?;
    Ok((StatusCode::CREATED, Json(json!(project))))
}

pub async fn list_projects(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let projects = state.store.list_projects().await?;
    Ok(Json(json!({ "projects": projects })))
}

pub async fn get_project(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let project = state.store.get_project(id).await.map_err(|_| ApiError::project_not_found(id))?;
    Ok(Json(json!(project)))
}

pub async fn get_project_state(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let project = state.store.get_project(id).await.map_err(|_| ApiError::project_not_found(id))?;
    let Some(run_id) = project.active_run_id else {
        return Ok(Json(json!({ "project": project, "run": Value::Null, "phase_results": [] })));
    };
    let run = state.store.get_run(run_id).await?;
    let phase_results = state.store.list_phase_results(run_id).await?;
    let jobs = state.store.list_jobs_for_run(run_id).await?;
    Ok(Json(json!({ "project": project, "run": run, "phase_results": phase_results, "jobs": jobs })))
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub phase: PhaseId,
    pub path: String,
    pub previous_value: Value,
    pub new_value: Value,
}

pub async fn save_edit(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>, Json(body): Json<EditRequest>) -> Result<Json<Value>, ApiError> {
    let project = state.store.get_project(id).await.map_err(|_| ApiError::project_not_found(id))?;
    let run_id = project.active_run_id.ok_or_else(|| ApiError::validation("project has no active run"))?;

    let edit = Edit { id: Uuid::new_v4(), run_id, phase: body.phase, path: body.path, previous_value: body.previous_value, new_value: body.new_value, created_at: chrono::Utc::now() };
    state.store.create_edit(edit).await?;
    Ok(Json(json!({ "status": "saved" })))
}

pub async fn get_history(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    let project = state.store.get_project(id).await.map_err(|_| ApiError::project_not_found(id))?;
    let Some(run_id) = project.active_run_id else {
        return Ok(Json(json!({ "history": [] })));
    };

    let mut edits = Vec::new();
    for phase in [PhaseId::Phase1, PhaseId::Phase2, PhaseId::Phase3, PhaseId::Phase4, PhaseId::Phase5, PhaseId::Phase6] {
        edits.extend(state.store.list_edits(run_id, phase).await?);
    }
    edits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(json!({ "history": edits })))
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    document_id: Uuid,
    project_id: Uuid,
    filename: String,
    byte_size: u64,
}

/// Multipart upload: `project_id` (form field), `kind` (`file` or `text`),
/// and either a `file` part or a `text` part carrying already-extracted
/// plain text. Reading bytes out of a binary document is an out-of-scope
/// collaborator's job; this endpoint only accepts text that collaborator
/// already produced.
pub async fn upload_document(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut project_id: Option<Uuid> = None;
    let mut kind: Option<String> = None;
    let mut filename = "document.txt".to_string();
    let mut text: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::validation(format!("invalid multipart body: {e}")))? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "project_id" => {
                let value = field.text().await.map_err(|e| ApiError::validation(e.to_string()))?;
                project_id = Some(Uuid::parse_str(&value).map_err(|_| ApiError::validation("project_id is not a valid uuid"))?);
            }
            "kind" => {
                kind = Some(field.text().await.map_err(|e| ApiError::validation(e.to_string()))?);
            }
            "text" => {
                let value = field.text().await.map_err(|e| ApiError::validation(e.to_string()))?;
                if value.len() as u64 > MAX_UPLOAD_BYTES {
                    return Err(ApiError::file_too_large(MAX_UPLOAD_BYTES));
                }
                text = Some(value);
            }
            "file" => {
                if let Some(name) = field.file_name() {
                    filename = name.to_string();
                }
                let bytes = field.bytes().await.map_err(|e| ApiError::validation(e.to_string()))?;
                if bytes.len() as u64 > MAX_UPLOAD_BYTES {
                    return Err(ApiError::file_too_large(MAX_UPLOAD_BYTES));
                }
                text = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            _ => {}
        }
    }

    let project_id = project_id.ok_or_else(|| ApiError::validation("project_id is required"))?;
    let kind = kind.unwrap_or_else(|| "text".to_string());
    if kind != "file" && kind != "text" {
        return Err(ApiError::validation("kind must be 'file' or 'text'"));
    }
    state.store.get_project(project_id).await.map_err(|_| ApiError::project_not_found(project_id))?;
    let text = text.ok_or_else(|| ApiError::validation("no file or text part provided"))?;
    let byte_size = text.len() as u64;

    let document = state.store.create_document(project_id, filename, text).await?;
    Ok((StatusCode::CREATED, Json(json!(UploadResponse { document_id: document.id, project_id, filename: document.filename.clone(), byte_size }))))
}
