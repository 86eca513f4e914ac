//! Connection supervisor for one configured database.
//!
//! The supervisor triggers the first real connection attempt lazily and
//! keeps retrying on a fixed interval until it succeeds. The probe's only
//! purpose is to validate connectivity: it acquires one handle and releases
//! it immediately. Teardown cancels any pending retry so no scheduled
//! callback outlives the supervisor.

use crate::config::{self, DatabaseConfig};
use crate::db::pool::Pool;
use crate::db::registry::PoolRegistry;
use crate::error::DbResult;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Observable connection state, surfaced to the host's status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Unconnected,
    Connecting,
    Connected,
    Failed,
}

/// Supervises connectivity for one database config.
pub struct ConnectionSupervisor {
    config: DatabaseConfig,
    registry: Arc<PoolRegistry>,
    reconnect_interval: Duration,
    /// Cached pool handle; set on the first connect call and kept for the
    /// supervisor's lifetime. Presence makes `connect` a no-op.
    pool: Mutex<Option<Arc<Pool>>>,
    /// Pending retry task. Sync mutex so teardown can abort without awaiting.
    retry: Mutex<Option<JoinHandle<()>>>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("path", &self.config.path)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl ConnectionSupervisor {
    /// Create a supervisor using the globally configured reconnect interval.
    pub fn new(config: DatabaseConfig, registry: Arc<PoolRegistry>) -> Arc<Self> {
        Self::with_reconnect_interval(config, registry, config::reconnect_interval())
    }

    /// Create a supervisor with an explicit reconnect interval.
    pub fn with_reconnect_interval(
        config: DatabaseConfig,
        registry: Arc<PoolRegistry>,
        reconnect_interval: Duration,
    ) -> Arc<Self> {
        let (status_tx, _) = watch::channel(ConnectionStatus::Unconnected);
        Arc::new(Self {
            config,
            registry,
            reconnect_interval,
            pool: Mutex::new(None),
            retry: Mutex::new(None),
            status_tx,
        })
    }

    /// Trigger the first connection attempt. Idempotent: once a pool handle
    /// is cached for this database, later calls are a no-op (a pending retry
    /// keeps running on its own).
    pub async fn connect(self: &Arc<Self>) {
        let pool = {
            let mut slot = self.pool.lock().unwrap();
            if slot.is_some() {
                return;
            }
            let pool = self.registry.get_or_create(
                &self.config.path,
                self.config.mode,
                &self.config.pool_options,
            );
            *slot = Some(Arc::clone(&pool));
            pool
        };

        self.status_tx.send_replace(ConnectionStatus::Connecting);
        match probe(&pool).await {
            Ok(()) => {
                self.clear_retry();
                self.status_tx.send_replace(ConnectionStatus::Connected);
                info!(path = %self.config.path, mode = %self.config.mode, "database connected");
            }
            Err(e) => {
                error!(path = %self.config.path, error = %e, "failed to open database");
                self.status_tx.send_replace(ConnectionStatus::Failed);
                self.arm_retry(pool);
            }
        }
    }

    /// Schedule re-probes every reconnect interval until one succeeds.
    fn arm_retry(self: &Arc<Self>, pool: Arc<Pool>) {
        let supervisor = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(supervisor.reconnect_interval).await;
                match probe(&pool).await {
                    Ok(()) => {
                        supervisor
                            .status_tx
                            .send_replace(ConnectionStatus::Connected);
                        info!(path = %supervisor.config.path, "database connected after retry");
                        break;
                    }
                    Err(e) => {
                        error!(path = %supervisor.config.path, error = %e, "reconnect attempt failed");
                        supervisor.status_tx.send_replace(ConnectionStatus::Failed);
                    }
                }
            }
        });
        *self.retry.lock().unwrap() = Some(task);
    }

    fn clear_retry(&self) {
        if let Some(task) = self.retry.lock().unwrap().take() {
            task.abort();
        }
    }

    /// Tear down: cancel any pending retry. The pool itself stays in the
    /// registry (pools are never closed).
    pub fn shutdown(&self) {
        self.clear_retry();
        info!(path = %self.config.path, "supervisor shut down");
    }

    /// The pool for this database, once `connect` has resolved it.
    pub fn pool(&self) -> Option<Arc<Pool>> {
        self.pool.lock().unwrap().clone()
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    /// Subscribe to status transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }
}

/// Validate connectivity: acquire one handle and release it immediately.
async fn probe(pool: &Pool) -> DbResult<()> {
    let handle = pool.acquire().await?;
    pool.release(handle);
    Ok(())
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        if let Some(task) = self.retry.lock().unwrap().take() {
            task.abort();
        }
    }
}
