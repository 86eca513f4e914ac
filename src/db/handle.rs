//! A single live connection to the embedded database.
//!
//! A `Handle` is exclusively owned: the pool moves it out on acquire and
//! takes it back on release, so none of these methods need interior
//! synchronization. Execution is synchronous once a handle is held; the
//! engine serializes access internally.

use crate::config::AccessMode;
use crate::db::values::{BindValue, cell_to_json};
use crate::error::{DbError, DbResult};
use crate::models::Row;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Engine busy timeout while a competing handle holds a write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One open database connection.
pub struct Handle {
    conn: Connection,
    path: String,
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").field("path", &self.path).finish()
    }
}

impl Handle {
    /// Open a connection to `path` with the given access mode. `Rw` and `Ro`
    /// refuse to create a missing file; `Ro` additionally rejects writes at
    /// the engine level.
    pub fn open(path: &str, mode: AccessMode) -> DbResult<Self> {
        let mut flags = OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI;
        flags |= match mode {
            AccessMode::Rwc => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
            AccessMode::Rw => OpenFlags::SQLITE_OPEN_READ_WRITE,
            AccessMode::Ro => OpenFlags::SQLITE_OPEN_READ_ONLY,
        };

        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| DbError::connection(path, e.to_string()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| DbError::connection(path, e.to_string()))?;

        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// Execute a row-returning query with positional binds and collect the
    /// full result set in engine return order.
    pub fn query_rows(&self, sql: &str, binds: &[JsonValue]) -> DbResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(binds.iter().map(BindValue)))?;
        collect_rows(&columns, &mut rows)
    }

    /// Execute a mutating statement with positional binds. Returns the number
    /// of affected rows.
    pub fn execute(&self, sql: &str, binds: &[JsonValue]) -> DbResult<usize> {
        let affected = self
            .conn
            .execute(sql, rusqlite::params_from_iter(binds.iter().map(BindValue)))?;
        Ok(affected)
    }

    /// Execute a multi-statement script as one unit. No parameter binding,
    /// no row results.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Execute a row-returning query binding named placeholders
    /// (`:name`, `@name`, `$name`) from the params object.
    pub fn query_rows_named(
        &self,
        sql: &str,
        params: &serde_json::Map<String, JsonValue>,
    ) -> DbResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        bind_named(&mut stmt, params)?;
        let mut rows = stmt.raw_query();
        collect_rows(&columns, &mut rows)
    }

    /// Execute a mutating statement binding named placeholders from the
    /// params object. Returns the number of affected rows.
    pub fn execute_named(
        &self,
        sql: &str,
        params: &serde_json::Map<String, JsonValue>,
    ) -> DbResult<usize> {
        let mut stmt = self.conn.prepare(sql)?;
        bind_named(&mut stmt, params)?;
        let affected = stmt.raw_execute()?;
        Ok(affected)
    }

    /// Load a native extension into this handle. Extension loading is
    /// re-disabled before returning, whether or not the load succeeded.
    pub fn load_extension(&self, path: &str) -> DbResult<()> {
        // Safety: the extension path comes from the message's extension
        // field, the same trust level as the SQL text itself.
        unsafe {
            self.conn.load_extension_enable()?;
            let loaded = self.conn.load_extension(path, None);
            self.conn.load_extension_disable()?;
            loaded?;
        }
        Ok(())
    }

    /// The database file this handle is connected to.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Bind every placeholder in `stmt` from the params object. A placeholder
/// with no matching key (after stripping the `:`/`@`/`$` prefix) is an
/// input-shape error; nameless positional placeholders are rejected since
/// prepared mode only carries an object.
fn bind_named(
    stmt: &mut rusqlite::Statement<'_>,
    params: &serde_json::Map<String, JsonValue>,
) -> DbResult<()> {
    let names: Vec<Option<String>> = (1..=stmt.parameter_count())
        .map(|i| stmt.parameter_name(i).map(|n| n.to_string()))
        .collect();

    for (idx, name) in names.iter().enumerate() {
        let Some(name) = name else {
            return Err(DbError::input_shape(
                "prepared statement uses a positional placeholder; only named placeholders can be bound from a params object",
            ));
        };
        let key = name.trim_start_matches([':', '@', '$']);
        let value = params.get(key).ok_or_else(|| {
            DbError::input_shape(format!("params object has no value for placeholder '{name}'"))
        })?;
        stmt.raw_bind_parameter(idx + 1, BindValue(value))?;
    }

    Ok(())
}

fn collect_rows(columns: &[String], rows: &mut rusqlite::Rows<'_>) -> DbResult<Vec<Row>> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut obj = Row::new();
        for (i, name) in columns.iter().enumerate() {
            obj.insert(name.clone(), cell_to_json(row.get_ref(i)?));
        }
        out.push(obj);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_handle() -> Handle {
        // In-memory databases accept every access mode's flags.
        Handle::open(":memory:", AccessMode::Rwc).unwrap()
    }

    #[test]
    fn test_open_missing_file_rw_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let result = Handle::open(path.to_str().unwrap(), AccessMode::Rw);
        assert!(matches!(result, Err(DbError::Connection { .. })));
    }

    #[test]
    fn test_open_missing_file_rwc_creates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.db");
        let handle = Handle::open(path.to_str().unwrap(), AccessMode::Rwc).unwrap();
        handle.execute("CREATE TABLE t (x INTEGER)", &[]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_readonly_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.db");
        let path = path.to_str().unwrap();
        {
            let writable = Handle::open(path, AccessMode::Rwc).unwrap();
            writable.execute("CREATE TABLE t (x INTEGER)", &[]).unwrap();
        }
        let readonly = Handle::open(path, AccessMode::Ro).unwrap();
        let result = readonly.execute("INSERT INTO t VALUES (1)", &[]);
        assert!(matches!(result, Err(DbError::Execution { .. })));
    }

    #[test]
    fn test_query_rows_in_order() {
        let handle = memory_handle();
        handle
            .execute_batch(
                "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
                 INSERT INTO t (id, name) VALUES (1, 'a'), (2, 'b'), (3, 'c');",
            )
            .unwrap();
        let rows = handle.query_rows("SELECT id, name FROM t ORDER BY id", &[]).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["id"], json!(1));
        assert_eq!(rows[2]["name"], json!("c"));
    }

    #[test]
    fn test_positional_binds() {
        let handle = memory_handle();
        handle.execute("CREATE TABLE t (x INTEGER, y TEXT)", &[]).unwrap();
        let affected = handle
            .execute("INSERT INTO t VALUES ($1, $2)", &[json!(7), json!("seven")])
            .unwrap();
        assert_eq!(affected, 1);
        let rows = handle
            .query_rows("SELECT y FROM t WHERE x = $1", &[json!(7)])
            .unwrap();
        assert_eq!(rows[0]["y"], json!("seven"));
    }

    #[test]
    fn test_named_binds() {
        let handle = memory_handle();
        handle.execute("CREATE TABLE t (x INTEGER, y TEXT)", &[]).unwrap();
        let params = json!({ "x": 1, "y": "one" });
        let affected = handle
            .execute_named(
                "INSERT INTO t VALUES (:x, :y)",
                params.as_object().unwrap(),
            )
            .unwrap();
        assert_eq!(affected, 1);

        let lookup = json!({ "x": 1 });
        let rows = handle
            .query_rows_named("SELECT y FROM t WHERE x = :x", lookup.as_object().unwrap())
            .unwrap();
        assert_eq!(rows[0]["y"], json!("one"));
    }

    #[test]
    fn test_named_bind_missing_key_errors() {
        let handle = memory_handle();
        handle.execute("CREATE TABLE t (x INTEGER)", &[]).unwrap();
        let params = json!({ "wrong": 1 });
        let result = handle.execute_named("INSERT INTO t VALUES (:x)", params.as_object().unwrap());
        assert!(matches!(result, Err(DbError::InputShape { .. })));
    }

    #[test]
    fn test_execute_batch_multiple_statements() {
        let handle = memory_handle();
        handle
            .execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1); INSERT INTO t VALUES (2);")
            .unwrap();
        let rows = handle.query_rows("SELECT COUNT(*) AS n FROM t", &[]).unwrap();
        assert_eq!(rows[0]["n"], json!(2));
    }

    #[test]
    fn test_syntax_error_is_execution_error() {
        let handle = memory_handle();
        let result = handle.query_rows("SELEKT wrong", &[]);
        assert!(matches!(result, Err(DbError::Execution { .. })));
    }

    #[test]
    fn test_load_extension_failure_reported() {
        let handle = memory_handle();
        let result = handle.load_extension("/nonexistent/extension.so");
        assert!(result.is_err());
        // Handle stays usable after a failed load.
        assert!(handle.query_rows("SELECT 1 AS one", &[]).is_ok());
    }
}
