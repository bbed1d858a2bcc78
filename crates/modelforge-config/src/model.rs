//! The assembled configuration model and its defaults.

use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub jobs: JobsConfig,
    pub admin: AdminConfig,
    pub log_json: bool,
    pub strict_extraction: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".to_string() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// `None` selects the in-memory store.
    pub dsn: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub default_provider: String,
    pub default_model: Option<String>,
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { default_provider: "anthropic".to_string(), default_model: None, retry_attempts: 3, retry_base_delay_ms: 500 }
    }
}

#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub max_concurrency: usize,
    pub hard_timeout_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { max_concurrency: 2, hard_timeout_secs: 600 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdminConfig {
    /// Credentials `/v1/admin/auth` exchanges for a bearer token. `None`
    /// disables admin-only endpoints entirely rather than leaving them
    /// unauthenticated.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            llm: LlmConfig::default(),
            jobs: JobsConfig::default(),
            admin: AdminConfig::default(),
            log_json: false,
            strict_extraction: false,
        }
    }
}

/// Shape of the optional TOML config file; every field is optional so a
/// file can override just the settings it cares about.
#[derive(Debug, Default, Deserialize)]
pub struct TomlConfig {
    pub server: Option<TomlServer>,
    pub store: Option<TomlStore>,
    pub llm: Option<TomlLlm>,
    pub jobs: Option<TomlJobs>,
    pub admin: Option<TomlAdmin>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TomlServer {
    pub bind_addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TomlStore {
    pub dsn: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TomlLlm {
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub retry_attempts: Option<u32>,
    pub retry_base_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TomlJobs {
    pub max_concurrency: Option<usize>,
    pub hard_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TomlAdmin {
    pub username: Option<String>,
    pub password: Option<String>,
}
