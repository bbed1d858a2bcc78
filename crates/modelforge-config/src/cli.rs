//! Command-line flags. Every flag also reads from an environment variable,
//! so a container deployment never has to spell out a flag the platform
//! already injects as an env var.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Default)]
#[command(name = "modelforge", about = "Business-plan-to-spreadsheet pipeline service")]
pub struct CliArgs {
    /// Path to a TOML config file. Defaults to `./modelforge.toml` if present.
    #[arg(long, env = "MODELFORGE_CONFIG")]
    pub config_path: Option<PathBuf>,

    /// Address the HTTP server binds to.
    #[arg(long, env = "MODELFORGE_BIND_ADDR")]
    pub bind_addr: Option<String>,

    /// Database connection string (`sqlite://...` or `postgres://...`). Omit for an in-memory store.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Default LLM provider (`anthropic`, `openai`, `google`) used when a project has no override.
    #[arg(long, env = "MODELFORGE_LLM_PROVIDER")]
    pub llm_provider: Option<String>,

    /// Default model name, overriding the provider's standard tier.
    #[arg(long, env = "MODELFORGE_LLM_MODEL")]
    pub llm_model: Option<String>,

    /// Maximum number of phase jobs executed concurrently.
    #[arg(long, env = "MODELFORGE_JOB_CONCURRENCY")]
    pub job_concurrency: Option<usize>,

    /// Hard timeout, in seconds, after which a running phase job is killed.
    #[arg(long, env = "MODELFORGE_JOB_HARD_TIMEOUT_SECS")]
    pub job_hard_timeout_secs: Option<u64>,

    /// Admin username for `/v1/admin/auth`. Unset disables admin endpoints entirely.
    #[arg(long, env = "MODELFORGE_ADMIN_USERNAME")]
    pub admin_username: Option<String>,

    /// Admin password for `/v1/admin/auth`.
    #[arg(long, env = "MODELFORGE_ADMIN_PASSWORD")]
    pub admin_password: Option<String>,

    /// Emit structured JSON logs instead of human-readable ones.
    #[arg(long, env = "MODELFORGE_LOG_JSON")]
    pub log_json: bool,

    /// Require document evidence for every Phase 5 extraction rather than tolerating inferred values.
    #[arg(long, env = "MODELFORGE_STRICT_EXTRACTION")]
    pub strict_extraction: bool,
}
