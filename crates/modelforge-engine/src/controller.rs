//! Accepts a phase request, validates gating and dependencies, and either
//! runs Phase 1 synchronously or dispatches a job through the runtime.
//! Enforces the "at most one non-terminal job per `(run_id, phase)`"
//! invariant as a check made right before job creation, the same
//! check-then-act-under-a-held-lock shape a duplicate-dispatch guard needs
//! regardless of what's backing the store.

use crate::emit_job::EmitJobWork;
use crate::emitter::SpreadsheetDriver;
use crate::recalc::ParamMap;
use modelforge_agents::{AgentError, LlmPhaseWork, Phase, Phase1Agent, Phase2Agent, Phase3Agent, Phase4Agent, Phase5Agent, PhaseContext};
use modelforge_audit::AuditLogger;
use modelforge_guards::apply_penalties;
use modelforge_jobs::Executor;
use modelforge_llm::LlmBackend;
use modelforge_prompts::PromptRegistry;
use modelforge_store::Store;
use modelforge_utils::canonical::fingerprint;
use modelforge_utils::error::{ModelForgeError, Result};
use modelforge_utils::types::{Job, PhaseId, PhaseResult};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub estimation_mode: bool,
    pub strict_extraction: bool,
    pub edits: Value,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DispatchResult {
    pub job_id: Option<Uuid>,
    pub status: &'static str,
    pub phase: PhaseId,
    pub result: Option<Value>,
}

pub struct PipelineController {
    store: Arc<dyn Store>,
    executor: Arc<Executor>,
    backends: HashMap<String, Arc<dyn LlmBackend>>,
    prompts: Arc<PromptRegistry>,
    audit: Arc<AuditLogger>,
    default_provider: String,
    default_model: String,
}

impl PipelineController {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        executor: Arc<Executor>,
        backends: HashMap<String, Arc<dyn LlmBackend>>,
        prompts: Arc<PromptRegistry>,
        audit: Arc<AuditLogger>,
        default_provider: String,
        default_model: String,
    ) -> Self {
        Self { store, executor, backends, prompts, audit, default_provider, default_model }
    }

    async fn resolve_backend_and_model(&self, project_id: Uuid) -> Result<(Arc<dyn LlmBackend>, String)> {
        let (provider, model) = self
            .store
            .get_project_llm_config(project_id)
            .await
            .map_err(|e| ModelForgeError::Store(e.to_string()))?;
        let provider = provider.unwrap_or_else(|| self.default_provider.clone());
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let backend = self
            .backends
            .get(&provider)
            .cloned()
            .ok_or_else(|| ModelForgeError::Validation(format!("no backend configured for provider '{provider}'")))?;
        Ok((backend, model))
    }

    fn agent_for(&self, phase: PhaseId, estimation_mode: bool) -> Arc<dyn Phase> {
        match phase {
            PhaseId::Phase1 => Arc::new(Phase1Agent { prompts: self.prompts.clone() }),
            PhaseId::Phase2 => Arc::new(Phase2Agent { prompts: self.prompts.clone() }),
            PhaseId::Phase3 => Arc::new(Phase3Agent { prompts: self.prompts.clone() }),
            PhaseId::Phase4 => Arc::new(Phase4Agent { prompts: self.prompts.clone(), estimation_mode }),
            PhaseId::Phase5 => Arc::new(Phase5Agent { prompts: self.prompts.clone() }),
            PhaseId::Phase6 => unreachable!("phase 6 has no LLM agent; handled by dispatch_export"),
        }
    }

    async fn build_context(&self, run_id: Uuid, phase: PhaseId, options: &DispatchOptions) -> Result<PhaseContext> {
        let run = self.store.get_run(run_id).await.map_err(store_err)?;
        let document = self.store.get_document(run.document_id).await.map_err(store_err)?;

        let mut prior_results = HashMap::new();
        for dep in phase.deps() {
            if let Some(pr) = self.store.get_phase_result(run_id, *dep).await.map_err(store_err)? {
                prior_results.insert(*dep, pr.result);
            }
        }

        Ok(PhaseContext {
            run_id,
            document_text: document.text,
            prior_results,
            edits: options.edits.clone(),
            strict_extraction: options.strict_extraction,
        })
    }

    async fn ensure_deps_satisfied(&self, run_id: Uuid, phase: PhaseId) -> Result<()> {
        for dep in phase.deps() {
            let has_result = self.store.get_phase_result(run_id, *dep).await.map_err(store_err)?.is_some();
            if !has_result {
                return Err(ModelForgeError::Conflict(format!("phase {phase} requires {dep} to have completed first")));
            }
        }
        Ok(())
    }

    /// Dispatches phases 2-5 as a job, or runs Phase 1 synchronously.
    /// Callers must route Phase 6 export requests through
    /// [`PipelineController::dispatch_export`] instead.
    pub async fn dispatch_phase(&self, project_id: Uuid, phase: PhaseId, options: DispatchOptions) -> Result<DispatchResult> {
        if phase == PhaseId::Phase6 {
            return Err(ModelForgeError::Validation("phase 6 is dispatched through dispatch_export".into()));
        }

        let project = self.store.get_project(project_id).await.map_err(store_err)?;
        let run_id = project.active_run_id.ok_or_else(|| ModelForgeError::Validation("project has no active run".into()))?;

        self.ensure_deps_satisfied(run_id, phase).await?;

        let (backend, model) = self.resolve_backend_and_model(project_id).await?;
        let agent = self.agent_for(phase, options.estimation_mode);
        let ctx = self.build_context(run_id, phase, &options).await?;

        if !phase.is_async() {
            let result = self.run_sync(run_id, phase, agent, backend, model, ctx).await?;
            return Ok(DispatchResult { job_id: None, status: "completed", phase, result: Some(result) });
        }

        if self.store.has_active_job(run_id, phase).await.map_err(store_err)? {
            return Err(ModelForgeError::Conflict(format!("phase {phase} already has a non-terminal job for this run")));
        }

        let job = Job::new(run_id, phase);
        self.store.create_job(job.clone()).await.map_err(store_err)?;

        let work = Arc::new(LlmPhaseWork { phase: agent, backend, audit: self.audit.clone(), ctx, model, temperature: DEFAULT_TEMPERATURE });
        self.executor.dispatch(job.id, work);

        Ok(DispatchResult { job_id: Some(job.id), status: "queued", phase, result: None })
    }

    async fn run_sync(
        &self,
        run_id: Uuid,
        phase: PhaseId,
        agent: Arc<dyn Phase>,
        backend: Arc<dyn LlmBackend>,
        model: String,
        ctx: PhaseContext,
    ) -> Result<Value> {
        let messages = agent.build_messages(&ctx);
        let prompt_text: String = messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
        let invocation = modelforge_llm::Invocation::new(messages, DEFAULT_TEMPERATURE, model.clone());
        let extract = backend.extract(invocation).await.map_err(|e| ModelForgeError::Provider(e.to_string()))?;

        self.audit
            .record(
                run_id,
                phase,
                extract.provider.clone(),
                extract.model_used.clone(),
                extract.tokens_input,
                extract.tokens_output,
                extract.latency_ms,
                Some(format!("{:?}", extract.stop_reason)),
            )
            .await;

        let output = agent.parse_result(extract.parsed, extract.warnings, &ctx).map_err(agent_err)?;
        let confidence = apply_penalties(output.base_confidence, &output.warnings);
        let warnings: Vec<String> = output.warnings.iter().map(ToString::to_string).collect();

        let phase_result = PhaseResult {
            run_id,
            phase,
            result: output.value.clone(),
            fingerprint: fingerprint(&prompt_text, &output.value),
            confidence: Some(confidence),
            warnings: warnings.clone(),
            created_at: chrono::Utc::now(),
        };
        self.store.save_phase_result(phase_result).await.map_err(store_err)?;

        Ok(json!({ "result": output.value, "confidence": confidence, "warnings": warnings }))
    }

    /// Dispatches Phase 6 as a job: no LLM call, just the emit plan plus
    /// whatever recalc parameters the caller wants baked into the
    /// generated workbook.
    pub async fn dispatch_export(
        &self,
        project_id: Uuid,
        project_name: String,
        parameters: ParamMap,
        driver: Arc<dyn SpreadsheetDriver>,
        file_sink: Arc<dyn Fn(Vec<u8>) + Send + Sync>,
    ) -> Result<DispatchResult> {
        let project = self.store.get_project(project_id).await.map_err(store_err)?;
        let run_id = project.active_run_id.ok_or_else(|| ModelForgeError::Validation("project has no active run".into()))?;

        self.ensure_deps_satisfied(run_id, PhaseId::Phase6).await?;
        if self.store.has_active_job(run_id, PhaseId::Phase6).await.map_err(store_err)? {
            return Err(ModelForgeError::Conflict("phase6 already has a non-terminal job for this run".into()));
        }

        let job = Job::new(run_id, PhaseId::Phase6);
        self.store.create_job(job.clone()).await.map_err(store_err)?;

        let work = Arc::new(EmitJobWork { store: self.store.clone(), run_id, project_name, driver, parameters, file_sink });
        self.executor.dispatch(job.id, work);

        Ok(DispatchResult { job_id: Some(job.id), status: "queued", phase: PhaseId::Phase6, result: None })
    }
}

fn store_err(e: modelforge_store::StoreError) -> ModelForgeError {
    match e {
        modelforge_store::StoreError::NotFound(what) => ModelForgeError::NotFound(what),
        other => ModelForgeError::Store(other.to_string()),
    }
}

fn agent_err(e: AgentError) -> ModelForgeError {
    match e {
        AgentError::EmptyCriticalResult(msg) => ModelForgeError::EmptyCriticalResult(msg),
        AgentError::MissingDependency(phase) => ModelForgeError::Conflict(format!("missing dependency: {phase:?}")),
    }
}
