use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

use crate::error::Result;

/// Owns the connection pool to the backing SQLite store and the lifecycle
/// operations (migration, pragma tuning, health check, close) around it.
#[derive(Clone)]
pub struct DatabaseManager {
    db_path: PathBuf,
    pool: Pool<Sqlite>,
}

impl DatabaseManager {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let manager = Self { db_path, pool };
        manager.optimize_for_performance().await?;
        manager.run_migrations().await?;

        info!(path = %manager.db_path.display(), "database initialized");
        Ok(manager)
    }

    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let manager = Self {
            db_path: PathBuf::from(":memory:"),
            pool,
        };
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&manager.pool)
            .await?;
        manager.run_migrations().await?;

        debug!("in-memory database initialized");
        Ok(manager)
    }

    async fn optimize_for_performance(&self) -> Result<()> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&self.pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await?;

        debug!("database pragmas applied");
        Ok(())
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
