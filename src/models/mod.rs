//! Data models for the message envelope exchanged with the host framework.

pub mod message;

pub use message::{Message, Row};
