//! The persistence contract both backends implement identically.

use crate::error::Result;
use async_trait::async_trait;
use modelforge_utils::types::{Document, Edit, Job, JobStatus, PhaseId, PhaseResult, Project, Run};
use uuid::Uuid;

/// A partial update to a job record: every field is optional, and only
/// the fields present are applied. `log_msg`, if present, is appended to
/// the job's log with a timestamp rather than replacing it. Backends
/// enforce that `progress` only increases and that a job already in a
/// terminal status cannot be changed further.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub log_msg: Option<String>,
    pub result_ref: Option<String>,
    pub result_data: Option<serde_json::Value>,
    pub error_msg: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_project(&self, name: String) -> Result<Project>;
    async fn get_project(&self, id: Uuid) -> Result<Project>;
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn set_active_run(&self, project_id: Uuid, run_id: Uuid) -> Result<()>;
    async fn set_project_llm_config(&self, project_id: Uuid, provider: Option<String>, model: Option<String>) -> Result<()>;
    async fn get_project_llm_config(&self, project_id: Uuid) -> Result<(Option<String>, Option<String>)>;

    async fn create_document(&self, project_id: Uuid, filename: String, text: String) -> Result<Document>;
    async fn get_document(&self, id: Uuid) -> Result<Document>;

    async fn create_run(&self, project_id: Uuid, document_id: Uuid) -> Result<Run>;
    async fn get_run(&self, id: Uuid) -> Result<Run>;

    async fn save_phase_result(&self, result: PhaseResult) -> Result<()>;
    async fn get_phase_result(&self, run_id: Uuid, phase: PhaseId) -> Result<Option<PhaseResult>>;
    async fn list_phase_results(&self, run_id: Uuid) -> Result<Vec<PhaseResult>>;

    async fn create_edit(&self, edit: Edit) -> Result<()>;
    async fn list_edits(&self, run_id: Uuid, phase: PhaseId) -> Result<Vec<Edit>>;

    async fn create_job(&self, job: Job) -> Result<()>;
    async fn get_job(&self, id: Uuid) -> Result<Job>;
    async fn update_job(&self, id: Uuid, update: JobUpdate) -> Result<()>;
    async fn has_active_job(&self, run_id: Uuid, phase: PhaseId) -> Result<bool>;
    async fn list_jobs_for_run(&self, run_id: Uuid) -> Result<Vec<Job>>;
}
