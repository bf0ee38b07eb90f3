//! # mentora-db
//!
//! PostgreSQL database layer for mentora.
//!
//! This crate provides:
//! - Connection pool management
//! - The durable job queue repository ([`PgJobRepository`])
//! - Chapter / proof repositories used by the workers
//! - The atomic approval transaction ([`PgGradingRepository`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use mentora_db::Database;
//! use mentora_core::{EnqueueOptions, JobRepository, QueueName};
//!
//! let db = Database::connect("postgres://localhost/mentora").await?;
//! db.jobs
//!     .enqueue_deduplicated(
//!         QueueName::ChapterContent,
//!         chapter_id,
//!         Some(serde_json::json!({ "chapter_id": chapter_id })),
//!         EnqueueOptions::for_queue(QueueName::ChapterContent),
//!     )
//!     .await?;
//! ```

pub mod chapters;
pub mod grading;
pub mod jobs;
pub mod pool;
pub mod proofs;

// Re-export core types
pub use mentora_core::*;

pub use chapters::PgChapterRepository;
pub use grading::PgGradingRepository;
pub use jobs::PgJobRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use proofs::PgProofRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Durable job queue.
    pub jobs: PgJobRepository,
    /// Chapter reads/writes owned by the content worker.
    pub chapters: PgChapterRepository,
    /// Study-case proof reads/writes owned by the grading worker.
    pub proofs: PgProofRepository,
    /// Atomic approval transaction.
    pub grading: PgGradingRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            jobs: PgJobRepository::new(pool.clone()),
            chapters: PgChapterRepository::new(pool.clone()),
            proofs: PgProofRepository::new(pool.clone()),
            grading: PgGradingRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Internal(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Release the underlying connection pool. Called on process shutdown
    /// so in-flight leases are released cleanly.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
