//! Configuration model: CLI flags and environment variables, layered over
//! an optional TOML file, layered over built-in defaults.

pub mod cli;
pub mod discovery;
pub mod model;

pub use cli::CliArgs;
pub use discovery::ConfigError;
pub use model::{AdminConfig, Config, JobsConfig, LlmConfig, ServerConfig, StoreConfig};
