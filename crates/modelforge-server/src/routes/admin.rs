//! Admin auth and prompt override management. Every route but `auth`
//! requires the bearer token that `auth` exchanges credentials for;
//! admin endpoints are unreachable entirely when no credentials are
//! configured.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use modelforge_prompts::PromptKey;
use modelforge_utils::types::{PhaseId, PromptType};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AuthRequest {
    pub username: String,
    pub password: String,
}

pub async fn auth(State(state): State<Arc<AppState>>, Json(body): Json<AuthRequest>) -> Result<Json<Value>, ApiError> {
    let (Some(username), Some(password)) = (state.config.admin.username.as_ref(), state.config.admin.password.as_ref()) else {
        return Err(ApiError::unauthorized("admin authentication is not configured"));
    };
    if *username != body.username || *password != body.password {
        return Err(ApiError::unauthorized("invalid credentials"));
    }

    let token = Uuid::new_v4().to_string();
    state.admin_tokens.write().expect("admin token set poisoned").insert(token.clone());
    Ok(Json(json!({ "token": token })))
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if state.config.admin.username.is_none() {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "admin endpoints are disabled"));
    }
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    if state.admin_tokens.read().expect("admin token set poisoned").contains(token) {
        Ok(())
    } else {
        Err(ApiError::unauthorized("invalid or expired bearer token"))
    }
}

#[derive(Debug, Deserialize)]
pub struct PromptSaveRequest {
    pub key: String,
    pub phase: PhaseId,
    pub prompt_type: PromptType,
    pub project_id: Option<Uuid>,
    pub content: String,
}

pub async fn save_prompt(State(state): State<Arc<AppState>>, headers: HeaderMap, Json(body): Json<PromptSaveRequest>) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let key = PromptKey { key: body.key, phase: body.phase, prompt_type: body.prompt_type };
    let version = state.prompts.save(&key, body.project_id, body.content);
    Ok(Json(json!(version)))
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub version_id: Uuid,
}

pub async fn activate_prompt(State(state): State<Arc<AppState>>, headers: HeaderMap, Json(body): Json<ActivateRequest>) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    state.prompts.activate(body.version_id).map_err(ApiError::validation)?;
    Ok(Json(json!({ "status": "activated" })))
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub key: String,
    pub phase: PhaseId,
    pub prompt_type: PromptType,
    pub project_id: Option<Uuid>,
}

pub async fn reset_prompt(State(state): State<Arc<AppState>>, headers: HeaderMap, Json(body): Json<ResetRequest>) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let key = PromptKey { key: body.key, phase: body.phase, prompt_type: body.prompt_type };
    state.prompts.reset(&key, body.project_id);
    Ok(Json(json!({ "status": "reset" })))
}
