//! Phase 6 spreadsheet export and its download endpoint.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use modelforge_utils::types::JobStatus;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub project_id: Uuid,
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
}

pub async fn export_excel(State(state): State<Arc<AppState>>, Json(body): Json<ExportRequest>) -> Result<(StatusCode, Json<Value>), ApiError> {
    let project = state.store.get_project(body.project_id).await.map_err(|_| ApiError::project_not_found(body.project_id))?;

    // `dispatch_export` only hands back its job id once the job is already
    // created and dispatched, so the sink can't be keyed by job id up
    // front. It drops the generated bytes into a private cell instead;
    // once dispatch returns with the real job id, a background task waits
    // for completion and moves the cell's contents into `export_files`.
    let pending: Arc<Mutex<Option<Vec<u8>>>> = Arc::new(Mutex::new(None));
    let sink_target = pending.clone();
    let file_sink: Arc<dyn Fn(Vec<u8>) + Send + Sync> = Arc::new(move |bytes: Vec<u8>| {
        *sink_target.lock().expect("pending export cell poisoned") = Some(bytes);
    });

    let result = state
        .controller
        .dispatch_export(body.project_id, project.name.clone(), body.parameters, state.driver.clone(), file_sink)
        .await?;

    if let Some(job_id) = result.job_id {
        let files = state.export_files.clone();
        let store = state.store.clone();
        tokio::spawn(stash_export_bytes_when_ready(store, files, job_id, pending));
    }

    let download_url = result.job_id.map(|id| format!("/v1/export/download/{id}"));
    Ok((StatusCode::ACCEPTED, Json(json!({ "job_id": result.job_id, "status": result.status, "download_url": download_url }))))
}

/// Polls `job_id` to a terminal state, then moves whatever bytes the
/// export job's sink deposited into `pending` into the keyed map that
/// `/v1/export/download/{job_id}` reads from. The sink runs synchronously
/// inside the job before the executor marks it `Completed`, so by the
/// time this observes that status the cell is already populated.
async fn stash_export_bytes_when_ready(
    store: Arc<dyn modelforge_store::Store>,
    files: Arc<std::sync::Mutex<HashMap<Uuid, Vec<u8>>>>,
    job_id: Uuid,
    pending: Arc<Mutex<Option<Vec<u8>>>>,
) {
    for _ in 0..600 {
        let Ok(job) = store.get_job(job_id).await else { return };
        if job.status.is_terminal() {
            if job.status == JobStatus::Completed {
                if let Some(bytes) = pending.lock().expect("pending export cell poisoned").take() {
                    files.lock().expect("export file map poisoned").insert(job_id, bytes);
                }
            }
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}

pub async fn download_export(State(state): State<Arc<AppState>>, Path(job_id): Path<Uuid>) -> Result<Response, ApiError> {
    let job = state.store.get_job(job_id).await.map_err(|_| ApiError::job_not_found(job_id))?;
    match job.status {
        JobStatus::Completed => {}
        JobStatus::Failed | JobStatus::Timeout => return Err(ApiError::not_ready(format!("export job {job_id} did not complete successfully"))),
        JobStatus::Queued | JobStatus::Running => return Err(ApiError::not_ready(format!("export job {job_id} is still running"))),
    }

    let files = state.export_files.lock().expect("export file map poisoned");
    let bytes = files.get(&job_id).cloned().ok_or_else(|| ApiError::file_not_found(format!("no generated file for job {job_id}")))?;
    drop(files);

    let filename = format!("model-{job_id}.xlsx");
    let encoded = format!("attachment; filename*=UTF-8''{}", urlencode_rfc5987(&filename));

    let mut response = bytes.into_response();
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"));
    response.headers_mut().insert(header::CONTENT_DISPOSITION, HeaderValue::from_str(&encoded).unwrap_or_else(|_| HeaderValue::from_static("attachment")));
    Ok(response)
}

fn urlencode_rfc5987(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        match *byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(*byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
