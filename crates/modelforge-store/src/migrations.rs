//! Additive schema migrations, embedded at compile time and applied in
//! order, tracked in `schema_migrations`. Each statement is idempotent
//! (`CREATE TABLE IF NOT EXISTS`) so re-running a migration is harmless; a
//! failure rolls back and is logged, not fatal to server startup.

use sqlx::any::AnyPool;
use sqlx::Row;

const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("migrations/0001_init.sql"))];

pub async fn run_migrations(pool: &AnyPool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE TABLE IF NOT EXISTS schema_migrations (version INTEGER PRIMARY KEY)")
        .execute(pool)
        .await?;

    for (version, sql) in MIGRATIONS {
        let applied: i64 = sqlx::query("SELECT COUNT(*) AS c FROM schema_migrations WHERE version = ?")
            .bind(version)
            .fetch_one(pool)
            .await?
            .try_get::<i64, _>("c")?;
        if applied > 0 {
            continue;
        }
        for statement in sql.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(pool).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)").bind(version).execute(pool).await?;
        tracing::info!(version, "applied schema migration");
    }
    Ok(())
}
