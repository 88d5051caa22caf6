// src/storage/mod.rs
//! SQLite-backed persistence for hits.

mod export;
mod hits;
mod schema;
mod sessions;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

pub(crate) use sessions::parse_timestamp;

/// SQLite database handle providing all persistence operations.
/// Cheap to share behind an `Arc`; the pool serialises writers while WAL
/// mode keeps readers concurrent.
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Open (or create) the database at the given path, enable WAL mode,
    /// and run schema migrations. Parent directories are created with
    /// owner-only permissions.
    pub async fn open(path: impl AsRef<Path>) -> Result<Db> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                create_private_dir(dir)
                    .with_context(|| format!("creating database directory {}", dir.display()))?;
            }
        }

        // busy_timeout makes concurrent writers wait for locks instead of
        // returning SQLITE_BUSY; without it pollers silently drop hits
        // under write contention.
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| format!("opening database {}", path.display()))?;

        let db = Db { pool };
        db.migrate().await?;

        debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Create the base schema and apply the V2 column migration.
    async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(schema::SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .context("creating schema")?;

        for stmt in schema::MIGRATION_V2_STATEMENTS {
            if let Err(e) = sqlx::query(stmt).execute(&self.pool).await {
                // SQLite reports "duplicate column name: X" when the column
                // already exists; expected on every reopen.
                if e.to_string().contains("duplicate column name") {
                    continue;
                }
                return Err(anyhow::Error::new(e).context(format!("executing migration: {stmt}")));
            }
        }

        sqlx::raw_sql(schema::MIGRATION_V2_INDEX_SQL)
            .execute(&self.pool)
            .await
            .context("creating V2 indexes")?;

        Ok(())
    }

    /// Release the connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}
