//! Configuration handling for sqlite-relay.
//!
//! The host framework's node configuration surfaces three things: which
//! database file to open, how to open it, and where each invocation's SQL
//! text comes from. Everything here is fixed at node setup time; nothing is
//! renegotiated per message.

use std::time::Duration;

/// Default bound on open handles per pool.
pub const DEFAULT_MAX_HANDLES: usize = 5;

/// Default supervisor reconnect interval in milliseconds.
pub const DEFAULT_RECONNECT_MS: u64 = 20_000;

/// Environment variable overriding the reconnect interval, in milliseconds.
pub const RECONNECT_ENV_VAR: &str = "SQLITE_RELAY_RECONNECT_MS";

/// How the database file is opened. Fixed at pool-configuration time; the
/// first caller to create a pool for a given path decides for everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessMode {
    /// Read-write, creating the file if missing.
    #[default]
    Rwc,
    /// Read-write, file must already exist.
    Rw,
    /// Read-only, file must already exist.
    Ro,
}

impl AccessMode {
    /// True when the open call should refuse to create a missing file.
    pub fn file_must_exist(&self) -> bool {
        matches!(self, Self::Rw | Self::Ro)
    }

    /// True when the handle may write.
    pub fn writable(&self) -> bool {
        matches!(self, Self::Rwc | Self::Rw)
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rwc => write!(f, "RWC"),
            Self::Rw => write!(f, "RW"),
            Self::Ro => write!(f, "RO"),
        }
    }
}

impl std::str::FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RWC" => Ok(Self::Rwc),
            "RW" => Ok(Self::Rw),
            "RO" => Ok(Self::Ro),
            other => Err(format!("unknown access mode '{other}' (expected RWC, RW or RO)")),
        }
    }
}

/// Where a node instance sources its SQL text and parameters. Selected once
/// at configuration time, not per message.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "sql")]
pub enum StatementSource {
    /// Free text from the message's query field, classified per invocation.
    Topic,
    /// The message's query field, always executed as a multi-statement script.
    Batch,
    /// A statement configured once at setup. `None`/empty means the node was
    /// never configured and every invocation reports a configuration error.
    Fixed(Option<String>),
    /// Configured SQL whose named placeholders are bound from the message's
    /// params object at each invocation.
    Prepared(Option<String>),
}

/// Connection pool sizing options.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PoolOptions {
    /// Maximum open handles per pool (default: 5).
    pub max_handles: Option<usize>,
}

impl PoolOptions {
    /// Get max_handles with the default applied.
    pub fn max_handles_or_default(&self) -> usize {
        self.max_handles.unwrap_or(DEFAULT_MAX_HANDLES)
    }

    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(0) = self.max_handles {
            return Err("max_handles must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Configuration for one database node: the file to open and how to open it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseConfig {
    /// Path to the database file. Sole key into the pool registry.
    pub path: String,
    /// Open semantics, decided by the first pool creator for this path.
    #[serde(default)]
    pub mode: AccessMode,
    /// Pool sizing.
    #[serde(default)]
    pub pool_options: PoolOptions,
}

impl DatabaseConfig {
    pub fn new(path: impl Into<String>, mode: AccessMode) -> Self {
        Self {
            path: path.into(),
            mode,
            pool_options: PoolOptions::default(),
        }
    }
}

/// Supervisor reconnect interval: the environment override when set and
/// parseable, the 20s default otherwise.
pub fn reconnect_interval() -> Duration {
    let ms = std::env::var(RECONNECT_ENV_VAR)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RECONNECT_MS);
    Duration::from_millis(ms)
}
