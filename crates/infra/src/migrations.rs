//! Forward-only SQL migrations.
//!
//! Every `*.sql` file in the migrations directory is applied once, in lexical
//! file name order. Applied names are recorded in `schema_migrations`; each
//! file runs in its own transaction together with its bookkeeping row, so a
//! failing file leaves no trace and the next start retries it.

use std::path::{Path, PathBuf};

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to read migrations from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("migration {name} failed: {source}")]
    Apply {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration bookkeeping failed: {0}")]
    Bookkeeping(#[source] sqlx::Error),
}

/// Apply every migration in `dir` not yet recorded. Returns the names applied.
#[instrument(skip(pool), fields(dir = %dir.display()), err)]
pub async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<Vec<String>, MigrationError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            name TEXT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(MigrationError::Bookkeeping)?;

    let applied: Vec<String> = sqlx::query_scalar("SELECT name FROM schema_migrations")
        .fetch_all(pool)
        .await
        .map_err(MigrationError::Bookkeeping)?;

    let mut newly_applied = Vec::new();
    for (name, path) in pending_migrations(dir, &applied)? {
        let sql = std::fs::read_to_string(&path).map_err(|source| MigrationError::Io {
            path: path.clone(),
            source,
        })?;
        apply(pool, &name, &sql).await?;
        tracing::info!(migration = %name, "migration applied");
        newly_applied.push(name);
    }
    Ok(newly_applied)
}

async fn apply(pool: &PgPool, name: &str, sql: &str) -> Result<(), MigrationError> {
    let wrap = |source| MigrationError::Apply {
        name: name.to_string(),
        source,
    };

    let mut tx = pool.begin().await.map_err(wrap)?;
    // Raw (unprepared) execution so a file may hold several statements.
    sqlx::raw_sql(sql).execute(&mut *tx).await.map_err(wrap)?;
    sqlx::query("INSERT INTO schema_migrations (name) VALUES ($1)")
        .bind(name)
        .execute(&mut *tx)
        .await
        .map_err(wrap)?;
    tx.commit().await.map_err(wrap)
}

/// `*.sql` files in `dir` whose names are not in `applied`, sorted by name.
fn pending_migrations(
    dir: &Path,
    applied: &[String],
) -> Result<Vec<(String, PathBuf)>, MigrationError> {
    let io_err = |source| MigrationError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut pending = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        if applied.contains(&name) {
            continue;
        }
        pending.push((name, path));
    }
    pending.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(pending)
}
