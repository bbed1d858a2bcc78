//! Synchronous recalculation, callable on every slider tick.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use modelforge_engine::recalc;
use modelforge_engine::RecalcResult;
use modelforge_utils::types::PhaseId;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RecalcRequest {
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
    #[serde(default)]
    pub edited_cells: HashMap<String, f64>,
    #[serde(default = "default_scenario")]
    pub scenario: String,
    pub best_multipliers: Option<HashMap<String, f64>>,
    pub worst_multipliers: Option<HashMap<String, f64>>,
}

fn default_scenario() -> String {
    "base".to_string()
}

pub async fn recalc_project(State(state): State<Arc<AppState>>, Json(body): Json<RecalcRequest>) -> Result<Json<RecalcResult>, ApiError> {
    let phase5_result = if let Some(project_id) = body.project_id {
        let project = state.store.get_project(project_id).await.map_err(|_| ApiError::project_not_found(project_id))?;
        match project.active_run_id {
            Some(run_id) => state.store.get_phase_result(run_id, PhaseId::Phase5).await?.map(|p| p.result),
            None => None,
        }
    } else {
        None
    };

    let best = body.best_multipliers.unwrap_or_else(modelforge_engine::recalc::default_best_multipliers);
    let worst = body.worst_multipliers.unwrap_or_else(modelforge_engine::recalc::default_worst_multipliers);

    let result = recalc(phase5_result.as_ref(), &body.parameters, &body.edited_cells, &body.scenario, &best, &worst);
    Ok(Json(result))
}
