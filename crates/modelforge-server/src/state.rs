//! Shared application state handed to every handler.

use modelforge_audit::AuditLogger;
use modelforge_config::Config;
use modelforge_engine::{PipelineController, SpreadsheetDriver};
use modelforge_prompts::PromptRegistry;
use modelforge_store::Store;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// Placeholder stand-in for the real workbook writer, which is out of
/// scope here: it renders the resolved emit output into a JSON blob
/// describing what a spreadsheet writer would need to place, so
/// `/v1/export/download/{job_id}` has real bytes to serve until a
/// genuine `SpreadsheetDriver` is wired in.
pub struct PlaceholderSpreadsheetDriver;

impl SpreadsheetDriver for PlaceholderSpreadsheetDriver {
    fn write(&self, project_name: &str, output: &modelforge_engine::EmitOutput) -> Result<Vec<u8>, String> {
        let summary = serde_json::json!({
            "project": project_name,
            "segment_count": output.plan.segment_count,
            "adopted_add_ons": output.plan.adopted_add_ons,
            "segment_revenue": output.segment_revenue,
            "pl_summary": output.pl.pl_summary,
            "kpis": output.pl.kpis,
        });
        serde_json::to_vec_pretty(&summary).map_err(|e| e.to_string())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub controller: Arc<PipelineController>,
    pub prompts: Arc<PromptRegistry>,
    pub audit: Arc<AuditLogger>,
    pub config: Config,
    pub driver: Arc<dyn SpreadsheetDriver>,
    /// Opaque bearer tokens issued by `/v1/admin/auth`, valid for the
    /// process lifetime.
    pub admin_tokens: Arc<RwLock<HashSet<String>>>,
    /// Generated export bytes keyed by job id, read back by
    /// `/v1/export/download/{job_id}`.
    pub export_files: Arc<Mutex<HashMap<Uuid, Vec<u8>>>>,
}

pub const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;
