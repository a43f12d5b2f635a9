pub mod connection;
pub mod embedding_repo;
pub mod fact_repo;
pub mod profile_repo;
pub mod thread_repo;
pub mod turn_repo;
pub mod vector;

pub use connection::DatabaseManager;
pub use embedding_repo::EmbeddingRepository;
pub use fact_repo::FactRepository;
pub use profile_repo::ProfileRepository;
pub use thread_repo::ThreadRepository;
pub use turn_repo::TurnRepository;

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::error::Result;
use crate::models::ThreadStatus;

/// Facade bundling the connection manager with one repository per entity,
/// plus the active-cardinality auto-repair routine (§3 invariant 1).
///
/// `lock` is the §5 reader/writer lock: every operation that reads then
/// writes Thread status or turn lists (ingest, append-turn, update-status,
/// delete-thread, repair-active) must hold the write side for the whole
/// read-mutate-write sequence; plain point reads may hold the read side.
/// `profile_lock` is the separate exclusive lock (§4.8, §5) guarding the
/// profile's read-merge-write cycle, independent of the thread/turn lock.
pub struct Store {
    manager: DatabaseManager,
    expected_dimension: Option<usize>,
    lock: Arc<RwLock<()>>,
    profile_lock: Arc<Mutex<()>>,
}

impl Store {
    pub fn new(manager: DatabaseManager, expected_dimension: Option<usize>) -> Self {
        Self {
            manager,
            expected_dimension,
            lock: Arc::new(RwLock::new(())),
            profile_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Acquire the store-wide write lock for a read-then-write sequence
    /// (§5). Held for the duration of the returned guard's lifetime.
    pub async fn write_guard(&self) -> OwnedRwLockWriteGuard<()> {
        self.lock.clone().write_owned().await
    }

    /// Acquire the store-wide read lock for a read-only sequence that must
    /// not race a concurrent write-locked mutation.
    pub async fn read_guard(&self) -> OwnedRwLockReadGuard<()> {
        self.lock.clone().read_owned().await
    }

    /// Acquire the exclusive profile lock for a read-merge-write cycle
    /// over the singleton UserProfile (§4.8, §5).
    pub async fn profile_guard(&self) -> OwnedMutexGuard<()> {
        self.profile_lock.clone().lock_owned().await
    }

    pub fn threads(&self) -> ThreadRepository {
        ThreadRepository::new(&self.manager)
    }

    pub fn turns(&self) -> TurnRepository {
        TurnRepository::new(&self.manager)
    }

    pub fn facts(&self) -> FactRepository {
        FactRepository::new(&self.manager)
    }

    pub fn embeddings(&self) -> EmbeddingRepository {
        EmbeddingRepository::new(&self.manager, self.expected_dimension)
    }

    pub fn profile(&self) -> ProfileRepository {
        ProfileRepository::new(&self.manager)
    }

    pub fn manager(&self) -> &DatabaseManager {
        &self.manager
    }

    pub async fn health_check(&self) -> Result<()> {
        self.manager.health_check().await
    }

    pub async fn close(self) {
        self.manager.close().await;
    }

    /// Keeps at most one ACTIVE Thread: if more than one is found, the most
    /// recently `updated_at` stays ACTIVE and the rest are PAUSEd. Returns
    /// whether any repair action was taken.
    pub async fn repair_active_cardinality(&self) -> Result<bool> {
        let threads = self.threads();
        let mut actives = threads.list_by_status(ThreadStatus::Active).await?;
        if actives.len() <= 1 {
            return Ok(false);
        }

        actives.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        for stale in &actives[1..] {
            threads.update_status(&stale.id, ThreadStatus::Paused).await?;
        }

        tracing::warn!(
            repaired_count = actives.len() - 1,
            "repaired multiple ACTIVE threads"
        );
        Ok(true)
    }
}
