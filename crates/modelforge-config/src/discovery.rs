//! Merges CLI flags (which already absorbed their environment variable via
//! `clap`'s `env` attribute), an optional TOML file, and built-in defaults,
//! in descending precedence.

use crate::cli::CliArgs;
use crate::model::{AdminConfig, Config, JobsConfig, LlmConfig, ServerConfig, StoreConfig, TomlConfig};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, #[source] source: toml::de::Error },
}

const DEFAULT_CONFIG_FILENAME: &str = "modelforge.toml";

impl Config {
    /// Builds a `Config` from CLI args (env-backed), an optional TOML file,
    /// and built-in defaults. Precedence, highest first: CLI/env, file,
    /// default.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_toml_file(cli.config_path.as_deref())?;
        let default = Config::default();

        Ok(Config {
            server: ServerConfig {
                bind_addr: cli
                    .bind_addr
                    .clone()
                    .or_else(|| file.server.as_ref().and_then(|s| s.bind_addr.clone()))
                    .unwrap_or(default.server.bind_addr),
            },
            store: StoreConfig { dsn: cli.database_url.clone().or_else(|| file.store.as_ref().and_then(|s| s.dsn.clone())) },
            llm: LlmConfig {
                default_provider: cli
                    .llm_provider
                    .clone()
                    .or_else(|| file.llm.as_ref().and_then(|l| l.default_provider.clone()))
                    .unwrap_or(default.llm.default_provider),
                default_model: cli.llm_model.clone().or_else(|| file.llm.as_ref().and_then(|l| l.default_model.clone())),
                retry_attempts: file.llm.as_ref().and_then(|l| l.retry_attempts).unwrap_or(default.llm.retry_attempts),
                retry_base_delay_ms: file.llm.as_ref().and_then(|l| l.retry_base_delay_ms).unwrap_or(default.llm.retry_base_delay_ms),
            },
            jobs: JobsConfig {
                max_concurrency: cli
                    .job_concurrency
                    .or_else(|| file.jobs.as_ref().and_then(|j| j.max_concurrency))
                    .unwrap_or(default.jobs.max_concurrency),
                hard_timeout_secs: cli
                    .job_hard_timeout_secs
                    .or_else(|| file.jobs.as_ref().and_then(|j| j.hard_timeout_secs))
                    .unwrap_or(default.jobs.hard_timeout_secs),
            },
            admin: AdminConfig {
                username: cli.admin_username.clone().or_else(|| file.admin.as_ref().and_then(|a| a.username.clone())),
                password: cli.admin_password.clone().or_else(|| file.admin.as_ref().and_then(|a| a.password.clone())),
            },
            log_json: cli.log_json,
            strict_extraction: cli.strict_extraction,
        })
    }
}

fn load_toml_file(explicit_path: Option<&Path>) -> Result<TomlConfig, ConfigError> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILENAME);
            if !default_path.exists() {
                return Ok(TomlConfig::default());
            }
            default_path
        }
    };

    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path: path.clone(), source })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let cli = CliArgs::default();
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.llm.default_provider, "anthropic");
        assert!(config.store.dsn.is_none());
    }

    #[test]
    fn cli_flag_overrides_default() {
        let mut cli = CliArgs::default();
        cli.bind_addr = Some("127.0.0.1:9000".to_string());
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn explicit_file_is_parsed_and_layered_under_cli() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("modelforge.toml");
        std::fs::write(&file_path, "[server]\nbind_addr = \"0.0.0.0:7000\"\n[llm]\ndefault_provider = \"openai\"\n").unwrap();

        let mut cli = CliArgs::default();
        cli.config_path = Some(file_path);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:7000");
        assert_eq!(config.llm.default_provider, "openai");

        cli.llm_provider = Some("google".to_string());
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.llm.default_provider, "google");
    }
}
