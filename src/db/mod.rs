//! Database access layer.
//!
//! This module provides:
//! - Handle lifecycle over the embedded engine
//! - Bounded pooling with async acquire
//! - The process-wide (registry-wide) pool map
//! - JSON ⇄ SQL value conversion

pub mod handle;
pub mod pool;
pub mod registry;
pub mod values;

pub use handle::Handle;
pub use pool::Pool;
pub use registry::PoolRegistry;
