use sqlx::{postgres::PgPool, Executor};

use super::{StoreError, StoreResult};

/// Schema migrations in the order they apply. Names are recorded in the
/// `migrations` table, so a name must never be reused.
const MIGRATIONS: &[(&str, &str)] = &[("0001_init", include_str!("../../migrations/0001_init.sql"))];

/// Apply every migration not yet recorded. Returns how many ran.
pub async fn run_migrations(pool: &PgPool) -> StoreResult<usize> {
    init_migrations_tracker(pool).await?;

    let mut applied = 0;
    for &(name, sql) in MIGRATIONS {
        if is_applied(pool, name).await? {
            tracing::debug!(migration = name, "already applied");
            continue;
        }

        tracing::info!(migration = name, "running migration");
        apply(pool, name, sql)
            .await
            .map_err(|source| StoreError::Migration { name, source })?;
        applied += 1;
    }

    tracing::info!(applied, total = MIGRATIONS.len(), "migrations complete");
    Ok(applied)
}

// Runs the script and records it in one transaction. A raw `&str` goes over
// the simple query protocol, which accepts several statements.
async fn apply(pool: &PgPool, name: &str, sql: &str) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    (&mut *tx).execute(sql).await?;
    record_migration(&mut tx, name).await?;
    tx.commit().await
}

async fn init_migrations_tracker(pool: &PgPool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn is_applied(pool: &PgPool, name: &str) -> StoreResult<bool> {
    let found: Option<i32> = sqlx::query_scalar("SELECT id FROM migrations WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

async fn record_migration(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO migrations (name) VALUES ($1) ON CONFLICT DO NOTHING")
        .bind(name)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_names_are_unique_and_ordered() {
        let names: Vec<&str> = MIGRATIONS.iter().map(|(name, _)| *name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_initial_schema_creates_tables() {
        let (_, sql) = MIGRATIONS[0];
        for table in ["patients", "todos", "notifications"] {
            assert!(sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
        assert!(sql.contains("REFERENCES patients (id) ON DELETE CASCADE"));
        assert!(sql.contains("REFERENCES todos (id) ON DELETE CASCADE"));
        assert!(!sql.contains("ON DELETE SET NULL"));
    }
}
