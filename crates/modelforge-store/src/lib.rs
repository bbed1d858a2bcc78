//! State store: one `Store` trait, two backends. A configured DSN selects
//! `SqlStore` (SQLite or Postgres, chosen by the DSN scheme); its absence,
//! or a single failed connection attempt, falls back to `MemoryStore` with
//! a logged warning rather than refusing to start.

pub mod error;
pub mod memory;
pub mod migrations;
pub mod sql;
pub mod trait_def;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sql::SqlStore;
pub use trait_def::{JobUpdate, Store};

use sqlx::any::{AnyPoolOptions, install_default_drivers};
use std::sync::Arc;

/// Build the store for the given optional DSN. Called once at server
/// startup.
pub async fn init(dsn: Option<&str>) -> Arc<dyn Store> {
    let Some(dsn) = dsn else {
        tracing::info!("no store DSN configured, using in-process fallback store");
        return Arc::new(MemoryStore::new());
    };

    install_default_drivers();
    match AnyPoolOptions::new().max_connections(10).connect(dsn).await {
        Ok(pool) => {
            if let Err(e) = migrations::run_migrations(&pool).await {
                tracing::warn!(error = %e, "schema migration failed, falling back to in-process store");
                return Arc::new(MemoryStore::new());
            }
            tracing::info!("connected to configured store backend");
            Arc::new(SqlStore::new(pool))
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to connect to configured store DSN, falling back to in-process store");
            Arc::new(MemoryStore::new())
        }
    }
}
