//! Statement router: classify, acquire, execute, release, respond.
//!
//! One router instance serves one configured node. Each dispatch sources the
//! SQL text per the node's statement mode, acquires exactly one handle from
//! the pool for the whole operation (including the optional extension-load
//! pre-step), and hands the message back with its payload replaced by the
//! result. Every failure is returned against the request that caused it; the
//! handle is released on every path.

pub mod classify;

pub use classify::{StatementKind, classify};

use crate::config::StatementSource;
use crate::db::pool::Pool;
use crate::error::{DbError, DbResult};
use crate::models::{Message, Row};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

/// How the planned statement binds its parameters.
enum Binds {
    None,
    Positional(Vec<JsonValue>),
    Named(serde_json::Map<String, JsonValue>),
}

/// What one dispatch will execute, resolved before any handle is acquired.
enum Plan {
    /// Nothing to do for this message (absent or empty query text).
    Skip,
    /// Classify the text and execute with the chosen access method.
    Classified { sql: String, binds: Binds },
    /// Multi-statement exec regardless of segment count.
    ForcedBatch { sql: String },
}

/// Routes messages for one configured node against one pool.
#[derive(Debug)]
pub struct StatementRouter {
    pool: Arc<Pool>,
    source: StatementSource,
}

impl StatementRouter {
    pub fn new(pool: Arc<Pool>, source: StatementSource) -> Self {
        Self { pool, source }
    }

    /// Execute one message. Returns `Ok(None)` when the message carries
    /// nothing to execute (absent or empty query text), `Ok(Some(_))` with
    /// the payload replaced by the result, or the per-request error.
    ///
    /// Configuration and input-shape errors are detected before a handle is
    /// acquired; execution and extension-load errors happen inside a single
    /// `with_handle` scope, so the handle is released no matter what.
    pub async fn dispatch(&self, msg: Message) -> DbResult<Option<Message>> {
        let plan = match self.plan(&msg) {
            Ok(Plan::Skip) => {
                debug!("no query text on message, skipping");
                return Ok(None);
            }
            Ok(plan) => plan,
            Err(e) => return Err(e),
        };

        let extension = msg.extension.clone();
        let rows = self
            .pool
            .with_handle(move |handle| {
                if let Some(ext) = &extension {
                    handle.load_extension(ext)?;
                }
                match plan {
                    Plan::ForcedBatch { sql } => {
                        handle.execute_batch(&sql)?;
                        Ok(Vec::new())
                    }
                    Plan::Classified { sql, binds } => run_classified(handle, &sql, binds),
                    Plan::Skip => unreachable!("skip handled before acquiring"),
                }
            })
            .await?;

        Ok(Some(msg.into_result(rows)))
    }

    /// Resolve the SQL text and binds for this message per the configured
    /// statement source. No handle is touched here.
    fn plan(&self, msg: &Message) -> DbResult<Plan> {
        match &self.source {
            StatementSource::Topic => {
                let Some(sql) = topic_text(msg)? else {
                    return Ok(Plan::Skip);
                };
                let binds = positional_binds(&sql, &msg.payload)?;
                Ok(Plan::Classified { sql, binds })
            }
            StatementSource::Batch => {
                let Some(sql) = topic_text(msg)? else {
                    return Ok(Plan::Skip);
                };
                Ok(Plan::ForcedBatch { sql })
            }
            StatementSource::Fixed(sql) => match sql.as_deref() {
                Some(sql) if !sql.is_empty() => Ok(Plan::Classified {
                    sql: sql.to_string(),
                    binds: Binds::None,
                }),
                _ => Err(DbError::config("SQL statement config not set up")),
            },
            StatementSource::Prepared(sql) => {
                let sql = match sql.as_deref() {
                    Some(sql) if !sql.is_empty() => sql.to_string(),
                    _ => return Err(DbError::config("prepared statement config not set up")),
                };
                let params = match &msg.params {
                    None => return Err(DbError::config("msg.params not passed")),
                    Some(JsonValue::Object(map)) => map.clone(),
                    Some(_) => return Err(DbError::config("msg.params is not an object")),
                };
                Ok(Plan::Classified {
                    sql,
                    binds: Binds::Named(params),
                })
            }
        }
    }
}

/// The message's query text: `Ok(None)` when absent or empty (quiet skip),
/// an input-shape error when present but not a string.
fn topic_text(msg: &Message) -> DbResult<Option<String>> {
    match &msg.topic {
        None => Ok(None),
        Some(JsonValue::String(s)) if s.is_empty() => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DbError::input_shape(
            "msg.topic: the query is not defined as a string",
        )),
    }
}

/// Positional binds for free-text mode: the payload array is bound when its
/// length matches the number of `$` placeholders in the text. A placeholder
/// count the payload array does not match is an input-shape error; a
/// non-array payload is ignored.
fn positional_binds(sql: &str, payload: &JsonValue) -> DbResult<Binds> {
    let placeholder_count = sql.matches('$').count();
    match payload {
        JsonValue::Array(values) if values.len() == placeholder_count => {
            if values.is_empty() {
                Ok(Binds::None)
            } else {
                Ok(Binds::Positional(values.clone()))
            }
        }
        JsonValue::Array(values) if placeholder_count > 0 => Err(DbError::input_shape(format!(
            "msg.payload has {} values for {} placeholders",
            values.len(),
            placeholder_count
        ))),
        _ => Ok(Binds::None),
    }
}

/// Execute a classified statement with the chosen access method.
fn run_classified(handle: &crate::db::Handle, sql: &str, binds: Binds) -> DbResult<Vec<Row>> {
    let kind = classify(sql);
    debug!(?kind, sql = %sql, "executing statement");
    match kind {
        StatementKind::Mutation => {
            match binds {
                Binds::Named(params) => handle.execute_named(sql, &params)?,
                Binds::Positional(values) => handle.execute(sql, &values)?,
                Binds::None => handle.execute(sql, &[])?,
            };
            Ok(Vec::new())
        }
        // Batch execution does not support parameterization.
        StatementKind::Batch => {
            handle.execute_batch(sql)?;
            Ok(Vec::new())
        }
        StatementKind::RowQuery => match binds {
            Binds::Named(params) => handle.query_rows_named(sql, &params),
            Binds::Positional(values) => handle.query_rows(sql, &values),
            Binds::None => handle.query_rows(sql, &[]),
        },
    }
}
