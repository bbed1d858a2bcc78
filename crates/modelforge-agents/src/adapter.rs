//! Bridges a `Phase` to the job runtime's `PhaseWork` contract: build
//! messages, call the provider, audit the call, and hand the guarded
//! output to the phase's own post-processing.

use crate::phase_trait::{AgentError, Phase, PhaseContext};
use async_trait::async_trait;
use modelforge_audit::AuditLogger;
use modelforge_jobs::PhaseWork;
use modelforge_llm::{Invocation, LlmBackend};
use std::sync::Arc;

pub struct LlmPhaseWork {
    pub phase: Arc<dyn Phase>,
    pub backend: Arc<dyn LlmBackend>,
    pub audit: Arc<AuditLogger>,
    pub ctx: PhaseContext,
    pub model: String,
    pub temperature: f32,
}

#[async_trait]
impl PhaseWork for LlmPhaseWork {
    async fn run(&self) -> Result<serde_json::Value, String> {
        let messages = self.phase.build_messages(&self.ctx);
        let invocation = Invocation::new(messages, self.temperature, self.model.clone());

        let result = self.backend.extract(invocation).await.map_err(|e| e.to_string())?;

        self.audit
            .record(
                self.ctx.run_id,
                self.phase.id(),
                result.provider.clone(),
                result.model_used.clone(),
                result.tokens_input,
                result.tokens_output,
                result.latency_ms,
                Some(format!("{:?}", result.stop_reason)),
            )
            .await;

        let output = self
            .phase
            .parse_result(result.parsed, result.warnings, &self.ctx)
            .map_err(|e| match e {
                AgentError::EmptyCriticalResult(msg) => msg,
                AgentError::MissingDependency(p) => format!("missing dependency: {p:?}"),
            })?;

        let confidence = modelforge_guards::apply_penalties(output.base_confidence, &output.warnings);
        Ok(serde_json::json!({
            "result": output.value,
            "confidence": confidence,
            "warnings": output.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
        }))
    }
}
