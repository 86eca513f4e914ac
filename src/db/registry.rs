//! Pool registry: one pool per database identifier.
//!
//! The registry is an explicit object owned by the application's top-level
//! context and passed by reference to whoever needs it, rather than ambient
//! process-global state; each test constructs its own. Entries are created
//! on demand and never removed.

use crate::config::{AccessMode, PoolOptions};
use crate::db::pool::Pool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Mapping from database file path to its pool.
#[derive(Default)]
pub struct PoolRegistry {
    /// Sync mutex, never held across an await; insert-if-absent is atomic
    /// with respect to concurrent first-time lookups for the same path.
    pools: Mutex<HashMap<String, Arc<Pool>>>,
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.pools.lock().unwrap().len())
            .finish()
    }
}

impl PoolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the pool for `path`, constructing it with `mode` and `options` on
    /// first reference.
    ///
    /// On every later call for the same path the existing pool is returned
    /// unchanged and the arguments are silently ignored: the first caller
    /// decides the access mode and sizing for everyone. Intentionally
    /// preserved behavior, covered by a regression test.
    pub fn get_or_create(
        &self,
        path: &str,
        mode: AccessMode,
        options: &PoolOptions,
    ) -> Arc<Pool> {
        let mut pools = self.pools.lock().unwrap();
        if let Some(pool) = pools.get(path) {
            return Arc::clone(pool);
        }
        debug!(path = %path, mode = %mode, "creating pool");
        let pool = Arc::new(Pool::new(path, mode, options));
        pools.insert(path.to_string(), Arc::clone(&pool));
        pool
    }

    /// Number of pools created so far.
    pub fn pool_count(&self) -> usize {
        self.pools.lock().unwrap().len()
    }
}
