//! Phase 6 as a dispatched job: no LLM call, just resolving the emit plan
//! and handing it to whatever [`SpreadsheetDriver`] the caller configured.

use crate::emitter::{resolve, SpreadsheetDriver};
use crate::recalc::ParamMap;
use async_trait::async_trait;
use modelforge_jobs::PhaseWork;
use modelforge_store::Store;
use modelforge_utils::types::PhaseId;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub struct EmitJobWork {
    pub store: Arc<dyn Store>,
    pub run_id: Uuid,
    pub project_name: String,
    pub driver: Arc<dyn SpreadsheetDriver>,
    pub parameters: ParamMap,
    /// Receives the generated workbook bytes so the caller can stash them
    /// wherever `/v1/export/download/{job_id}` later reads them from. This
    /// job doesn't know or care whether that's an in-memory map or object
    /// storage.
    pub file_sink: Arc<dyn Fn(Vec<u8>) + Send + Sync>,
}

#[async_trait]
impl PhaseWork for EmitJobWork {
    async fn run(&self) -> Result<serde_json::Value, String> {
        let phase3 = self
            .store
            .get_phase_result(self.run_id, PhaseId::Phase3)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "phase3 result missing".to_string())?;
        let phase4 = self
            .store
            .get_phase_result(self.run_id, PhaseId::Phase4)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "phase4 result missing".to_string())?;

        let output = resolve(&phase3.result, &phase4.result, &self.parameters);
        let bytes = self.driver.write(&self.project_name, &output)?;
        let byte_size = bytes.len();
        (self.file_sink)(bytes);

        Ok(json!({
            "segment_count": output.plan.segment_count,
            "adopted_add_ons": output.plan.adopted_add_ons,
            "byte_size": byte_size,
        }))
    }
}
