//! Bounded handle pool for one database file.
//!
//! A pool owns up to `max_handles` open handles. `acquire` suspends on a
//! semaphore when the bound is reached; `release` returns the handle to the
//! idle set for reuse and never closes it. Handles are moved out on acquire
//! and back on release, so a checked-out handle is exclusively owned by one
//! in-flight operation.
//!
//! The idle set sits behind a synchronous mutex that is never held across an
//! await point; `acquire` is the only suspension point in the crate.

use crate::config::{AccessMode, PoolOptions};
use crate::db::handle::Handle;
use crate::error::{DbError, DbResult};
use std::sync::Mutex;
use tokio::sync::Semaphore;
use tracing::debug;

/// Bounded set of reusable handles for one database identifier.
pub struct Pool {
    path: String,
    mode: AccessMode,
    max_handles: usize,
    /// Permits bound total live handles. A permit is forgotten while its
    /// handle is checked out and added back on release or failed open.
    semaphore: Semaphore,
    idle: Mutex<Vec<Handle>>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("max_handles", &self.max_handles)
            .finish_non_exhaustive()
    }
}

impl Pool {
    /// Create a pool for `path`. No handle is opened until the first acquire.
    pub fn new(path: impl Into<String>, mode: AccessMode, options: &PoolOptions) -> Self {
        let max_handles = options.max_handles_or_default();
        Self {
            path: path.into(),
            mode,
            max_handles,
            semaphore: Semaphore::new(max_handles),
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Acquire a handle, reusing an idle one when available and opening a new
    /// one otherwise. Suspends while the pool is at its bound; fails when the
    /// underlying open call fails (missing file under `RW`/`RO`, lock, I/O).
    pub async fn acquire(&self) -> DbResult<Handle> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| DbError::connection(&self.path, "pool semaphore closed"))?;
        // The permit stays taken for as long as the handle is checked out.
        permit.forget();

        if let Some(handle) = self.idle.lock().unwrap().pop() {
            debug!(path = %self.path, "reusing idle handle");
            return Ok(handle);
        }

        match Handle::open(&self.path, self.mode) {
            Ok(handle) => {
                debug!(path = %self.path, mode = %self.mode, "opened new handle");
                Ok(handle)
            }
            Err(e) => {
                // The slot stays usable by other callers.
                self.semaphore.add_permits(1);
                Err(e)
            }
        }
    }

    /// Return a handle to the idle set for reuse. Never closes it.
    pub fn release(&self, handle: Handle) {
        let idle_count = {
            let mut idle = self.idle.lock().unwrap();
            idle.push(handle);
            idle.len()
        };
        self.semaphore.add_permits(1);
        debug!(path = %self.path, idle = idle_count, "returned handle to pool");
    }

    /// Acquire a handle, run `body` on it, and release unconditionally.
    /// The body's failure is the caller's concern; the handle always goes
    /// back, so an erroring request cannot starve the pool.
    pub async fn with_handle<T>(
        &self,
        body: impl FnOnce(&Handle) -> DbResult<T>,
    ) -> DbResult<T> {
        let handle = self.acquire().await?;
        let result = body(&handle);
        self.release(handle);
        result
    }

    /// Handles currently sitting idle.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().len()
    }

    /// Maximum live handles for this pool.
    pub fn capacity(&self) -> usize {
        self.max_handles
    }

    /// The database file this pool serves.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The access mode every handle in this pool is opened with.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn file_pool(dir: &tempfile::TempDir, max_handles: usize) -> Pool {
        let path = dir.path().join("pool.db");
        Pool::new(
            path.to_str().unwrap(),
            AccessMode::Rwc,
            &PoolOptions {
                max_handles: Some(max_handles),
            },
        )
    }

    #[tokio::test]
    async fn test_acquire_release_reuses_handle() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir, 2);

        let handle = pool.acquire().await.unwrap();
        assert_eq!(pool.idle_count(), 0);
        pool.release(handle);
        assert_eq!(pool.idle_count(), 1);

        // Reacquire gets the idle handle back, not a second open.
        let _again = pool.acquire().await.unwrap();
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_acquire_fails_when_file_missing_rw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let pool = Pool::new(
            path.to_str().unwrap(),
            AccessMode::Rw,
            &PoolOptions::default(),
        );

        let result = pool.acquire().await;
        assert!(matches!(result, Err(DbError::Connection { .. })));
        // The failed open returned its permit; a later acquire can still
        // proceed once the file exists.
        std::fs::write(&path, b"").unwrap();
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_bound_never_exceeded_under_contention() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Arc::new(file_pool(&dir, 2));

        // Check out both slots, then queue three more acquirers.
        let h1 = pool.acquire().await.unwrap();
        let h2 = pool.acquire().await.unwrap();

        let mut waiters = Vec::new();
        for _ in 0..3 {
            let pool = Arc::clone(&pool);
            waiters.push(tokio::spawn(async move {
                let handle = pool.acquire().await.unwrap();
                pool.release(handle);
            }));
        }

        // Waiters are parked, not failing.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(waiters.iter().all(|w| !w.is_finished()));

        pool.release(h1);
        pool.release(h2);
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should get a handle after release")
                .unwrap();
        }
        // Never more than 2 live handles existed; both are idle now.
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_with_handle_releases_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir, 1);

        let result: DbResult<()> = pool
            .with_handle(|handle| {
                handle.query_rows("NOT VALID SQL", &[])?;
                Ok(())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(pool.idle_count(), 1);

        // Pool is not starved: the single slot is immediately reusable.
        let rows = pool
            .with_handle(|handle| handle.query_rows("SELECT 1 AS one", &[]))
            .await
            .unwrap();
        assert_eq!(rows[0]["one"], json!(1));
    }

    #[tokio::test]
    async fn test_repeated_cycles_keep_single_handle() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(&dir, 3);

        for _ in 0..50 {
            let handle = pool.acquire().await.unwrap();
            pool.release(handle);
        }
        assert_eq!(pool.idle_count(), 1);
    }
}
