//! SQL-backed store over `sqlx::any::AnyPool`, so the same query text
//! drives either SQLite or Postgres depending on which DSN scheme the
//! operator configured. Every non-primitive column (timestamps, uuids,
//! JSON blobs, enums) is stored as TEXT and parsed on the way out, which
//! keeps one code path working across both drivers instead of juggling
//! driver-specific `FromRow` impls.

use crate::error::{Result, StoreError};
use crate::trait_def::{JobUpdate, Store};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modelforge_utils::types::{Document, Edit, Job, JobStatus, PhaseId, PhaseResult, Project, Run};
use sqlx::any::AnyPool;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    #[must_use]
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::Corrupt(format!("invalid uuid {s}: {e}")))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("invalid timestamp {s}: {e}")))
}

fn parse_phase(s: &str) -> Result<PhaseId> {
    PhaseId::from_str(s).map_err(|_| StoreError::Corrupt(format!("invalid phase {s}")))
}

fn parse_status(s: &str) -> Result<JobStatus> {
    match s {
        "queued" => Ok(JobStatus::Queued),
        "running" => Ok(JobStatus::Running),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        "timeout" => Ok(JobStatus::Timeout),
        other => Err(StoreError::Corrupt(format!("invalid job status {other}"))),
    }
}

fn row_to_project(row: &sqlx::any::AnyRow) -> Result<Project> {
    Ok(Project {
        id: parse_uuid(row.try_get::<String, _>("id")?.as_str())?,
        name: row.try_get("name")?,
        created_at: parse_time(row.try_get::<String, _>("created_at")?.as_str())?,
        updated_at: parse_time(row.try_get::<String, _>("updated_at")?.as_str())?,
        active_run_id: row.try_get::<Option<String>, _>("active_run_id")?.map(|s| parse_uuid(&s)).transpose()?,
        llm_provider: row.try_get("llm_provider")?,
        llm_model: row.try_get("llm_model")?,
    })
}

fn row_to_job(row: &sqlx::any::AnyRow) -> Result<Job> {
    let log_json: String = row.try_get("log")?;
    let result_data: Option<String> = row.try_get("result_data")?;
    Ok(Job {
        id: parse_uuid(row.try_get::<String, _>("id")?.as_str())?,
        run_id: parse_uuid(row.try_get::<String, _>("run_id")?.as_str())?,
        phase: parse_phase(row.try_get::<String, _>("phase")?.as_str())?,
        status: parse_status(row.try_get::<String, _>("status")?.as_str())?,
        progress: row.try_get::<i64, _>("progress")? as u8,
        log: serde_json::from_str(&log_json).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        result_ref: row.try_get("result_ref")?,
        result_data: result_data.map(|s| serde_json::from_str(&s)).transpose().map_err(|e| StoreError::Corrupt(e.to_string()))?,
        error_msg: row.try_get("error_msg")?,
        created_at: parse_time(row.try_get::<String, _>("created_at")?.as_str())?,
        updated_at: parse_time(row.try_get::<String, _>("updated_at")?.as_str())?,
    })
}

#[async_trait]
impl Store for SqlStore {
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
        sqlx::query("INSERT INTO projects (id, name, created_at, updated_at, active_run_id, llm_provider, llm_model) VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(project.id.to_string())
            .bind(&project.name)
            .bind(project.created_at.to_rfc3339())
            .bind(project.updated_at.to_rfc3339())
            .bind(Option::<String>::None)
            .bind(Option::<String>::None)
            .bind(Option::<String>::None)
            .execute(&self.pool)
            .await?;
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> Result<Project> {
        let row = sqlx::query("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("project {id}")))?;
        row_to_project(&row)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows = sqlx::query("SELECT * FROM projects").fetch_all(&self.pool).await?;
        rows.iter().map(row_to_project).collect()
    }

    async fn set_active_run(&self, project_id: Uuid, run_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE projects SET active_run_id = ?, updated_at = ? WHERE id = ?")
            .bind(run_id.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(project_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_project_llm_config(&self, project_id: Uuid, provider: Option<String>, model: Option<String>) -> Result<()> {
        sqlx::query("UPDATE projects SET llm_provider = ?, llm_model = ? WHERE id = ?")
            .bind(provider)
            .bind(model)
            .bind(project_id.to_string())
            .execute(&self.pool)
            .await?;
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
        sqlx::query("INSERT INTO documents (id, project_id, filename, byte_size, text, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(document.id.to_string())
            .bind(document.project_id.to_string())
            .bind(&document.filename)
            .bind(document.byte_size as i64)
            .bind(&document.text)
            .bind(document.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(document)
    }

    async fn get_document(&self, id: Uuid) -> Result<Document> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("document {id}")))?;
        Ok(Document {
            id: parse_uuid(row.try_get::<String, _>("id")?.as_str())?,
            project_id: parse_uuid(row.try_get::<String, _>("project_id")?.as_str())?,
            filename: row.try_get("filename")?,
            byte_size: row.try_get::<i64, _>("byte_size")? as u64,
            text: row.try_get("text")?,
            created_at: parse_time(row.try_get::<String, _>("created_at")?.as_str())?,
        })
    }

    async fn create_run(&self, project_id: Uuid, document_id: Uuid) -> Result<Run> {
        let run = Run { id: Uuid::new_v4(), project_id, document_id, created_at: Utc::now() };
        sqlx::query("INSERT INTO runs (id, project_id, document_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(run.id.to_string())
            .bind(run.project_id.to_string())
            .bind(run.document_id.to_string())
            .bind(run.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(run)
    }

    async fn get_run(&self, id: Uuid) -> Result<Run> {
        let row = sqlx::query("SELECT * FROM runs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("run {id}")))?;
        Ok(Run {
            id: parse_uuid(row.try_get::<String, _>("id")?.as_str())?,
            project_id: parse_uuid(row.try_get::<String, _>("project_id")?.as_str())?,
            document_id: parse_uuid(row.try_get::<String, _>("document_id")?.as_str())?,
            created_at: parse_time(row.try_get::<String, _>("created_at")?.as_str())?,
        })
    }

    async fn save_phase_result(&self, result: PhaseResult) -> Result<()> {
        let warnings = serde_json::to_string(&result.warnings).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let value = serde_json::to_string(&result.result).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        sqlx::query(
            "INSERT INTO phase_results (run_id, phase, result, fingerprint, confidence, warnings, created_at) VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (run_id, phase) DO UPDATE SET result = excluded.result, fingerprint = excluded.fingerprint, \
             confidence = excluded.confidence, warnings = excluded.warnings, created_at = excluded.created_at",
        )
        .bind(result.run_id.to_string())
        .bind(result.phase.to_string())
        .bind(value)
        .bind(&result.fingerprint)
        .bind(result.confidence)
        .bind(warnings)
        .bind(result.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_phase_result(&self, run_id: Uuid, phase: PhaseId) -> Result<Option<PhaseResult>> {
        let row = sqlx::query("SELECT * FROM phase_results WHERE run_id = ? AND phase = ?")
            .bind(run_id.to_string())
            .bind(phase.to_string())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        Ok(Some(row_to_phase_result(&row)?))
    }

    async fn list_phase_results(&self, run_id: Uuid) -> Result<Vec<PhaseResult>> {
        let rows = sqlx::query("SELECT * FROM phase_results WHERE run_id = ?")
            .bind(run_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_phase_result).collect()
    }

    async fn create_edit(&self, edit: Edit) -> Result<()> {
        let previous = serde_json::to_string(&edit.previous_value).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let new = serde_json::to_string(&edit.new_value).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        sqlx::query("INSERT INTO edits (id, run_id, phase, path, previous_value, new_value, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)")
            .bind(edit.id.to_string())
            .bind(edit.run_id.to_string())
            .bind(edit.phase.to_string())
            .bind(&edit.path)
            .bind(previous)
            .bind(new)
            .bind(edit.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_edits(&self, run_id: Uuid, phase: PhaseId) -> Result<Vec<Edit>> {
        let rows = sqlx::query("SELECT * FROM edits WHERE run_id = ? AND phase = ? ORDER BY created_at ASC")
            .bind(run_id.to_string())
            .bind(phase.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(Edit {
                    id: parse_uuid(row.try_get::<String, _>("id")?.as_str())?,
                    run_id: parse_uuid(row.try_get::<String, _>("run_id")?.as_str())?,
                    phase: parse_phase(row.try_get::<String, _>("phase")?.as_str())?,
                    path: row.try_get("path")?,
                    previous_value: serde_json::from_str(&row.try_get::<String, _>("previous_value")?)
                        .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                    new_value: serde_json::from_str(&row.try_get::<String, _>("new_value")?).map_err(|e| StoreError::Corrupt(e.to_string()))?,
                    created_at: parse_time(row.try_get::<String, _>("created_at")?.as_str())?,
                })
            })
            .collect()
    }

    async fn create_job(&self, job: Job) -> Result<()> {
        let log = serde_json::to_string(&job.log).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let result_data = job.result_data.as_ref().map(serde_json::to_string).transpose().map_err(|e| StoreError::Corrupt(e.to_string()))?;
        sqlx::query(
            "INSERT INTO jobs (id, run_id, phase, status, progress, log, result_ref, result_data, error_msg, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id.to_string())
        .bind(job.run_id.to_string())
        .bind(job.phase.to_string())
        .bind(job.status.to_string())
        .bind(job.progress as i64)
        .bind(log)
        .bind(job.result_ref)
        .bind(result_data)
        .bind(job.error_msg)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Job> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
        row_to_job(&row)
    }

    async fn update_job(&self, id: Uuid, update: JobUpdate) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("job {id}")))?;
        let current = row_to_job(&row)?;
        if current.status.is_terminal() {
            return Ok(());
        }

        let status = update.status.unwrap_or(current.status);
        let progress = current.progress.max(update.progress.unwrap_or(current.progress));
        let mut log = current.log;
        if let Some(msg) = update.log_msg {
            log.push(format!("[{}] {msg}", Utc::now().to_rfc3339()));
        }
        let result_ref = update.result_ref.or(current.result_ref);
        let result_data = update.result_data.or(current.result_data);
        let error_msg = update.error_msg.or(current.error_msg);

        let log_json = serde_json::to_string(&log).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let result_data_json = result_data.as_ref().map(serde_json::to_string).transpose().map_err(|e| StoreError::Corrupt(e.to_string()))?;

        sqlx::query(
            "UPDATE jobs SET status = ?, progress = ?, log = ?, result_ref = ?, result_data = ?, error_msg = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.to_string())
        .bind(progress as i64)
        .bind(log_json)
        .bind(result_ref)
        .bind(result_data_json)
        .bind(error_msg)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn has_active_job(&self, run_id: Uuid, phase: PhaseId) -> Result<bool> {
        let count: i64 = sqlx::query(
            "SELECT COUNT(*) AS c FROM jobs WHERE run_id = ? AND phase = ? AND status IN ('queued', 'running')",
        )
        .bind(run_id.to_string())
        .bind(phase.to_string())
        .fetch_one(&self.pool)
        .await?
        .try_get("c")?;
        Ok(count > 0)
    }

    async fn list_jobs_for_run(&self, run_id: Uuid) -> Result<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE run_id = ?").bind(run_id.to_string()).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_job).collect()
    }
}

fn row_to_phase_result(row: &sqlx::any::AnyRow) -> Result<PhaseResult> {
    Ok(PhaseResult {
        run_id: parse_uuid(row.try_get::<String, _>("run_id")?.as_str())?,
        phase: parse_phase(row.try_get::<String, _>("phase")?.as_str())?,
        result: serde_json::from_str(&row.try_get::<String, _>("result")?).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        fingerprint: row.try_get("fingerprint")?,
        confidence: row.try_get("confidence")?,
        warnings: serde_json::from_str(&row.try_get::<String, _>("warnings")?).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        created_at: parse_time(row.try_get::<String, _>("created_at")?.as_str())?,
    })
}
