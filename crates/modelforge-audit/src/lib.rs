//! Records every LLM call made during a run and aggregates a cost/usage
//! summary. Persistence is an injected async closure so the logger never
//! has an opinion about where records eventually live; a failure there is
//! logged and swallowed rather than surfaced to the caller, since losing
//! an audit row must never fail the phase it was recording.

use chrono::Utc;
use modelforge_utils::types::{AuditRecord, PhaseId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use uuid::Uuid;

type PersistFn = Box<dyn Fn(AuditRecord) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send>> + Send + Sync>;

pub struct AuditLogger {
    records: Mutex<Vec<AuditRecord>>,
    persist: Option<PersistFn>,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct PhaseBreakdown {
    pub call_count: u64,
    pub tokens_input: u64,
    pub tokens_output: u64,
}

#[derive(Debug, Default, serde::Serialize)]
pub struct AuditSummary {
    pub total_calls: u64,
    pub total_tokens_input: u64,
    pub total_tokens_output: u64,
    pub by_phase: HashMap<String, PhaseBreakdown>,
}

impl AuditLogger {
    #[must_use]
    pub fn new() -> Self {
        Self { records: Mutex::new(Vec::new()), persist: None }
    }

    #[must_use]
    pub fn with_persistence(persist: PersistFn) -> Self {
        Self { records: Mutex::new(Vec::new()), persist: Some(persist) }
    }

    pub async fn record(
        &self,
        run_id: Uuid,
        phase: PhaseId,
        provider: String,
        model: String,
        tokens_input: Option<u64>,
        tokens_output: Option<u64>,
        latency_ms: u64,
        stop_reason: Option<String>,
    ) {
        let record = AuditRecord {
            id: Uuid::new_v4(),
            run_id,
            phase,
            provider,
            model,
            tokens_input,
            tokens_output,
            latency_ms,
            stop_reason,
            created_at: Utc::now(),
        };

        self.records.lock().expect("audit log mutex poisoned").push(record.clone());

        if let Some(persist) = &self.persist {
            if let Err(e) = persist(record).await {
                tracing::warn!(error = %e, "failed to persist audit record, keeping in-memory copy only");
            }
        }
    }

    #[must_use]
    pub fn summary(&self) -> AuditSummary {
        let records = self.records.lock().expect("audit log mutex poisoned");
        let mut summary = AuditSummary::default();
        for record in records.iter() {
            summary.total_calls += 1;
            summary.total_tokens_input += record.tokens_input.unwrap_or(0);
            summary.total_tokens_output += record.tokens_output.unwrap_or(0);
            let entry = summary.by_phase.entry(record.phase.to_string()).or_default();
            entry.call_count += 1;
            entry.tokens_input += record.tokens_input.unwrap_or(0);
            entry.tokens_output += record.tokens_output.unwrap_or(0);
        }
        summary
    }

    #[must_use]
    pub fn records_for_run(&self, run_id: Uuid) -> Vec<AuditRecord> {
        self.records
            .lock()
            .expect("audit log mutex poisoned")
            .iter()
            .filter(|r| r.run_id == run_id)
            .cloned()
            .collect()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn summary_aggregates_calls_and_tokens_per_phase() {
        let logger = AuditLogger::new();
        let run_id = Uuid::new_v4();
        logger
            .record(run_id, PhaseId::Phase2, "anthropic".into(), "claude-sonnet-4-5".into(), Some(100), Some(50), 800, Some("end_turn".into()))
            .await;
        logger
            .record(run_id, PhaseId::Phase2, "anthropic".into(), "claude-sonnet-4-5".into(), Some(200), Some(75), 900, Some("end_turn".into()))
            .await;

        let summary = logger.summary();
        assert_eq!(summary.total_calls, 2);
        assert_eq!(summary.total_tokens_input, 300);
        assert_eq!(summary.total_tokens_output, 125);
        let phase2 = &summary.by_phase["phase2"];
        assert_eq!(phase2.call_count, 2);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_lose_in_memory_record() {
        let logger = AuditLogger::with_persistence(Box::new(|_record| Box::pin(async { Err("disk full".to_string()) })));
        let run_id = Uuid::new_v4();
        logger
            .record(run_id, PhaseId::Phase3, "openai".into(), "gpt-4.1".into(), None, None, 500, None)
            .await;
        assert_eq!(logger.records_for_run(run_id).len(), 1);
    }
}
