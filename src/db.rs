//! Database module
//!
//! Startup checks against the Postgres schema.

use std::time::Duration;

use sqlx::PgPool;

/// Tables the store reads and writes
const REQUIRED_TABLES: &[&str] = &["users", "wallets", "transactions"];

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for &table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}

/// Count PENDING transactions last touched more than `older_than` ago.
///
/// These are transfers whose FAILED record could not be written and need
/// manual reconciliation.
pub async fn count_stale_pending(pool: &PgPool, older_than: Duration) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM transactions
        WHERE status = 'PENDING'
          AND updated_at < NOW() - make_interval(secs => $1)
        "#,
    )
    .bind(older_than.as_secs_f64())
    .fetch_one(pool)
    .await
}
