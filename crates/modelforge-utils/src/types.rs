//! Core data-model entities (spec section 3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the six pipeline phases. Phase 1 is served synchronously; phases
/// 2-6 are dispatched as jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PhaseId {
    Phase1,
    Phase2,
    Phase3,
    Phase4,
    Phase5,
    Phase6,
}

impl PhaseId {
    /// Phases this phase depends on having a completed `PhaseResult` for.
    #[must_use]
    pub fn deps(self) -> &'static [PhaseId] {
        match self {
            PhaseId::Phase1 => &[],
            PhaseId::Phase2 => &[PhaseId::Phase1],
            PhaseId::Phase3 => &[PhaseId::Phase2],
            PhaseId::Phase4 => &[PhaseId::Phase3],
            PhaseId::Phase5 => &[PhaseId::Phase4],
            PhaseId::Phase6 => &[PhaseId::Phase3, PhaseId::Phase4],
        }
    }

    /// Whether this phase is dispatched through the job runtime (all but Phase 1).
    #[must_use]
    pub fn is_async(self) -> bool {
        !matches!(self, PhaseId::Phase1)
    }
}

/// A project owns a single uploaded document and the runs made against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub active_run_id: Option<Uuid>,
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
}

/// An uploaded source document, already extracted to plain text by the
/// (out of scope) reader collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub filename: String,
    pub byte_size: u64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// One attempt at driving a project's document through the phase pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub project_id: Uuid,
    pub document_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// The persisted output of a phase for a given run. At most one row per
/// `(run_id, phase)`; replacing overwrites rather than versions (spec open
/// question: no additional snapshotting beyond `Edit` history).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub run_id: Uuid,
    pub phase: PhaseId,
    pub result: serde_json::Value,
    pub fingerprint: String,
    pub confidence: Option<f64>,
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A user edit applied on top of a `PhaseResult`, addressed by JSON pointer
/// path. The sole history mechanism for prior values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edit {
    pub id: Uuid,
    pub run_id: Uuid,
    pub phase: PhaseId,
    pub path: String,
    pub previous_value: serde_json::Value,
    pub new_value: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Timeout,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Timeout)
    }

    /// Whether `self -> next` is a legal transition in the job FSM.
    #[must_use]
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Queued, Running) => true,
            (Running, Running) => true,
            (Running, Completed | Failed | Timeout) => true,
            _ => false,
        }
    }
}

/// An asynchronous unit of work dispatched by the pipeline controller and
/// driven by the job runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub run_id: Uuid,
    pub phase: PhaseId,
    pub status: JobStatus,
    pub progress: u8,
    pub log: Vec<String>,
    pub result_ref: Option<String>,
    pub result_data: Option<serde_json::Value>,
    pub error_msg: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    #[must_use]
    pub fn new(run_id: Uuid, phase: PhaseId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            run_id,
            phase,
            status: JobStatus::Queued,
            progress: 0,
            log: Vec::new(),
            result_ref: None,
            result_data: None,
            error_msg: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One audited LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub run_id: Uuid,
    pub phase: PhaseId,
    pub provider: String,
    pub model: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
    pub latency_ms: u64,
    pub stop_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PromptType {
    System,
    User,
}

/// One version of a named prompt, scoped globally or to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptVersion {
    pub id: Uuid,
    pub key: String,
    pub phase: PhaseId,
    pub prompt_type: PromptType,
    pub project_id: Option<Uuid>,
    pub content: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    pub default_provider: String,
    pub default_model: String,
    pub strict_extraction: bool,
}
