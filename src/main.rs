//! `modelforge` daemon binary: loads configuration, builds the pipeline
//! stack, and serves the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use modelforge_config::CliArgs;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();
    let config = modelforge_config::Config::load(&cli).context("loading configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("modelforge=info,tower_http=info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let state = modelforge::build_state(config.clone()).await;
    let app = modelforge_server::build_app(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await.with_context(|| format!("binding to {}", config.server.bind_addr))?;
    tracing::info!(bind_addr = %config.server.bind_addr, "modelforge listening");

    axum::serve(listener, app).await.context("serving http")
}
