//! In-process fallback backend: no external database, state lives only as
//! long as the server process does. Used when no DSN is configured, or
//! when the configured DSN fails to connect at startup.

use crate::error::{Result, StoreError};
use crate::trait_def::{JobUpdate, Store};
use async_trait::async_trait;
use chrono::Utc;
use modelforge_utils::types::{Document, Edit, Job, PhaseId, PhaseResult, Project, Run};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<Uuid, Project>>,
    documents: RwLock<HashMap<Uuid, Document>>,
    runs: RwLock<HashMap<Uuid, Run>>,
    phase_results: RwLock<HashMap<(Uuid, PhaseId), PhaseResult>>,
    edits: RwLock<Vec<Edit>>,
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_project(&self, name: String) -> Result<Project> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name,
            created_at: now,
            updated_at: now,
            active_run_id: None,
            llm_provider: None,
            llm_model: None,
        };
        self.projects.write().unwrap().insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> Result<Project> {
        self.projects
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("project {id}")))
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(self.projects.read().unwrap().values().cloned().collect())
    }

    async fn set_active_run(&self, project_id: Uuid, run_id: Uuid) -> Result<()> {
        let mut projects = self.projects.write().unwrap();
        let project = projects
            .get_mut(&project_id)
            .ok_or_else(|| StoreError::NotFound(format!("project {project_id}")))?;
        project.active_run_id = Some(run_id);
        project.updated_at = Utc::now();
        Ok(())
    }

    async fn set_project_llm_config(&self, project_id: Uuid, provider: Option<String>, model: Option<String>) -> Result<()> {
        let mut projects = self.projects.write().unwrap();
        let project = projects
            .get_mut(&project_id)
            .ok_or_else(|| StoreError::NotFound(format!("project {project_id}")))?;
        project.llm_provider = provider;
        project.llm_model = model;
        Ok(())
    }

    async fn get_project_llm_config(&self, project_id: Uuid) -> Result<(Option<String>, Option<String>)> {
        let project = self.get_project(project_id).await?;
        Ok((project.llm_provider, project.llm_model))
    }

    async fn create_document(&self, project_id: Uuid, filename: String, text: String) -> Result<Document> {
        let document = Document {
            id: Uuid::new_v4(),
            project_id,
            byte_size: text.len() as u64,
            filename,
            text,
            created_at: Utc::now(),
        };
        self.documents.write().unwrap().insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document(&self, id: Uuid) -> Result<Document> {
        self.documents
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))
    }

    async fn create_run(&self, project_id: Uuid, document_id: Uuid) -> Result<Run> {
        let run = Run { id: Uuid::new_v4(), project_id, document_id, created_at: Utc::now() };
        self.runs.write().unwrap().insert(run.id, run.clone());
        Ok(run)
    }

    async fn get_run(&self, id: Uuid) -> Result<Run> {
        self.runs.read().unwrap().get(&id).cloned().ok_or_else(|| StoreError::NotFound(format!("run {id}")))
    }

    async fn save_phase_result(&self, result: PhaseResult) -> Result<()> {
        self.phase_results.write().unwrap().insert((result.run_id, result.phase), result);
        Ok(())
    }

    async fn get_phase_result(&self, run_id: Uuid, phase: PhaseId) -> Result<Option<PhaseResult>> {
        Ok(self.phase_results.read().unwrap().get(&(run_id, phase)).cloned())
    }

    async fn list_phase_results(&self, run_id: Uuid) -> Result<Vec<PhaseResult>> {
        Ok(self
            .phase_results
            .read()
            .unwrap()
            .values()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect())
    }

    async fn create_edit(&self, edit: Edit) -> Result<()> {
        self.edits.write().unwrap().push(edit);
        Ok(())
    }

    async fn list_edits(&self, run_id: Uuid, phase: PhaseId) -> Result<Vec<Edit>> {
        Ok(self
            .edits
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.run_id == run_id && e.phase == phase)
            .cloned()
            .collect())
    }

    async fn create_job(&self, job: Job) -> Result<()> {
        self.jobs.write().unwrap().insert(job.id, job);
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Job> {
        self.jobs.read().unwrap().get(&id).cloned().ok_or_else(|| StoreError::NotFound(format!("job {id}")))
    }

    async fn update_job(&self, id: Uuid, update: JobUpdate) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&id).ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
        if job.status.is_terminal() {
            return Ok(());
        }

        if let Some(status) = update.status {
            job.status = status;
        }
        if let Some(progress) = update.progress {
            job.progress = job.progress.max(progress);
        }
        if let Some(msg) = update.log_msg {
            job.log.push(format!("[{}] {msg}", Utc::now().to_rfc3339()));
        }
        if let Some(result_ref) = update.result_ref {
            job.result_ref = Some(result_ref);
        }
        if let Some(result_data) = update.result_data {
            job.result_data = Some(result_data);
        }
        if let Some(error_msg) = update.error_msg {
            job.error_msg = Some(error_msg);
        }
        job.updated_at = Utc::now();
        Ok(())
    }

    async fn has_active_job(&self, run_id: Uuid, phase: PhaseId) -> Result<bool> {
        Ok(self
            .jobs
            .read()
            .unwrap()
            .values()
            .any(|j| j.run_id == run_id && j.phase == phase && !j.status.is_terminal()))
    }

    async fn list_jobs_for_run(&self, run_id: Uuid) -> Result<Vec<Job>> {
        Ok(self.jobs.read().unwrap().values().filter(|j| j.run_id == run_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelforge_utils::types::JobStatus;

    #[tokio::test]
    async fn project_round_trips() {
        let store = MemoryStore::new();
        let project = store.create_project("Acme".into()).await.unwrap();
        let fetched = store.get_project(project.id).await.unwrap();
        assert_eq!(fetched.name, "Acme");
    }

    #[tokio::test]
    async fn at_most_one_active_job_per_run_and_phase() {
        let store = MemoryStore::new();
        let run_id = Uuid::new_v4();
        let job = Job::new(run_id, PhaseId::Phase2);
        store.create_job(job.clone()).await.unwrap();
        assert!(store.has_active_job(run_id, PhaseId::Phase2).await.unwrap());

        let update = JobUpdate { status: Some(JobStatus::Completed), ..Default::default() };
        store.update_job(job.id, update).await.unwrap();
        assert!(!store.has_active_job(run_id, PhaseId::Phase2).await.unwrap());
    }

    #[tokio::test]
    async fn progress_never_decreases() {
        let store = MemoryStore::new();
        let job = Job::new(Uuid::new_v4(), PhaseId::Phase2);
        store.create_job(job.clone()).await.unwrap();

        store.update_job(job.id, JobUpdate { progress: Some(40), ..Default::default() }).await.unwrap();
        store.update_job(job.id, JobUpdate { progress: Some(10), ..Default::default() }).await.unwrap();

        assert_eq!(store.get_job(job.id).await.unwrap().progress, 40);
    }

    #[tokio::test]
    async fn terminal_job_ignores_further_updates() {
        let store = MemoryStore::new();
        let job = Job::new(Uuid::new_v4(), PhaseId::Phase2);
        store.create_job(job.clone()).await.unwrap();

        store
            .update_job(job.id, JobUpdate { status: Some(JobStatus::Completed), progress: Some(100), ..Default::default() })
            .await
            .unwrap();
        store.update_job(job.id, JobUpdate { status: Some(JobStatus::Running), progress: Some(55), ..Default::default() }).await.unwrap();

        let finished = store.get_job(job.id).await.unwrap();
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.progress, 100);
    }

    #[tokio::test]
    async fn log_msg_is_appended_with_timestamp() {
        let store = MemoryStore::new();
        let job = Job::new(Uuid::new_v4(), PhaseId::Phase2);
        store.create_job(job.clone()).await.unwrap();

        store.update_job(job.id, JobUpdate { log_msg: Some("starting".into()), ..Default::default() }).await.unwrap();
        store.update_job(job.id, JobUpdate { log_msg: Some("halfway".into()), ..Default::default() }).await.unwrap();

        let finished = store.get_job(job.id).await.unwrap();
        assert_eq!(finished.log.len(), 2);
        assert!(finished.log[0].ends_with("starting"));
        assert!(finished.log[1].ends_with("halfway"));
    }

    #[tokio::test]
    async fn phase_result_replace_overwrites_not_versions() {
        let store = MemoryStore::new();
        let run_id = Uuid::new_v4();
        let first = PhaseResult {
            run_id,
            phase: PhaseId::Phase2,
            result: serde_json::json!({"v": 1}),
            fingerprint: "aaaa".into(),
            confidence: Some(0.9),
            warnings: vec![],
            created_at: Utc::now(),
        };
        store.save_phase_result(first).await.unwrap();
        let mut second = store.get_phase_result(run_id, PhaseId::Phase2).await.unwrap().unwrap();
        second.result = serde_json::json!({"v": 2});
        store.save_phase_result(second).await.unwrap();

        let results = store.list_phase_results(run_id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].result, serde_json::json!({"v": 2}));
    }
}
