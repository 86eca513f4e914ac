//! Pooled access and statement dispatch for embedded SQLite.
//!
//! The crate keeps one bounded handle pool per database file and routes
//! JSON-shaped messages to the right execution method:
//! - **Pooling**: lazy handle creation up to a fixed bound, async waiters
//!   when the pool is saturated, handles recycled on release
//! - **Classification**: a deliberately coarse keyword check picks between
//!   row query, mutation, and multi-statement batch
//! - **Routing**: statement text comes from the message topic, a fixed
//!   configured statement, or a prepared statement with named parameters
//! - **Supervision**: lazy first connect with fixed-interval retry and an
//!   observable status channel
//!
//! Results are written back into the message payload as an array of JSON
//! row objects.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod router;
pub mod supervisor;

pub use config::{AccessMode, DatabaseConfig, PoolOptions, StatementSource};
pub use db::{Handle, Pool, PoolRegistry};
pub use error::{DbError, DbResult};
pub use models::Message;
pub use router::{StatementKind, StatementRouter};
pub use supervisor::{ConnectionStatus, ConnectionSupervisor};
