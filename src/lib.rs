//! Wires the configured store, LLM backends, prompt registry, audit log,
//! job executor, and pipeline controller into one `modelforge-server`
//! app. `main.rs` is the thin binary entrypoint; this is where a test
//! harness or an alternate binary would build the same stack.

use modelforge_audit::AuditLogger;
use modelforge_config::Config;
use modelforge_engine::PipelineController;
use modelforge_jobs::Executor;
use modelforge_llm::{construct_backend_for_provider, standard_model_for, LlmBackend};
use modelforge_prompts::{defaults::builtin_prompts, PromptRegistry};
use modelforge_server::{AppState, PlaceholderSpreadsheetDriver};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

/// Builds every collaborator `modelforge-server` needs from a loaded
/// [`Config`]. Connects to the configured store (falling back to an
/// in-memory one on failure, per `modelforge_store::init`), constructs a
/// retry-wrapped backend for every provider with credentials available in
/// the environment, and assembles the pipeline controller around them.
pub async fn build_state(config: Config) -> Arc<AppState> {
    let store = modelforge_store::init(config.store.dsn.as_deref()).await;
    let executor = Arc::new(Executor::new(store.clone(), config.jobs.max_concurrency, Duration::from_secs(config.jobs.hard_timeout_secs)));
    let prompts = Arc::new(PromptRegistry::new(builtin_prompts()));
    let audit = Arc::new(AuditLogger::new());

    let mut backends: HashMap<String, Arc<dyn LlmBackend>> = HashMap::new();
    for provider in ["anthropic", "openai", "google"] {
        match construct_backend_for_provider(provider, config.llm.retry_attempts, Duration::from_millis(config.llm.retry_base_delay_ms)) {
            Ok(backend) => {
                backends.insert(provider.to_string(), Arc::from(backend));
            }
            Err(e) => {
                tracing::warn!(provider, error = %e, "provider backend unavailable, skipping (likely missing credentials)");
            }
        }
    }

    let default_model = config.llm.default_model.clone().or_else(|| standard_model_for(&config.llm.default_provider).map(ToString::to_string)).unwrap_or_default();

    let controller = Arc::new(PipelineController::new(store.clone(), executor, backends, prompts.clone(), audit.clone(), config.llm.default_provider.clone(), default_model));

    Arc::new(AppState {
        store,
        controller,
        prompts,
        audit,
        driver: Arc::new(PlaceholderSpreadsheetDriver),
        admin_tokens: Arc::new(RwLock::new(HashSet::new())),
        export_files: Arc::new(Mutex::new(HashMap::new())),
        config,
    })
}
