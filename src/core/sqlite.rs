//! Concrete `Engine` implementation over `rusqlite`.
//!
//! Connection setup (WAL, busy timeout, foreign keys) is grounded on the
//! teacher's `core/db.rs::db_connect`; per-database write serialization is
//! grounded on `core/broker.rs::DbBroker::with_conn` and `core/pool.rs`'s
//! busy-timeout tuning, collapsed here into a single `Mutex<Connection>`
//! because spec §5 already requires one engine instance per in-flight
//! `apply` call — there is no cross-call pooling concern this crate needs
//! to solve, only in-process protection against a caller sharing one engine
//! across overlapping `apply` calls.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::{Value as RusqliteValue, ValueRef};
use rusqlite::{Connection, InterruptHandle, OptionalExtension};

use crate::core::engine::Engine;
use crate::core::error::PatchKitError;
use crate::core::value::{SqlArg, SqlScalar};

/// `rusqlite`-backed `Engine`. One instance should back exactly one
/// in-flight `PatchKit::apply` call against its target database.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
    interrupt_handle: InterruptHandle,
}

impl SqliteEngine {
    /// Open `db_path` with patchkit's standard connection configuration:
    /// WAL journaling, a 5-second busy timeout, and foreign keys enforced.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, PatchKitError> {
        let conn = Connection::open(db_path.as_ref())?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let interrupt_handle = conn.get_interrupt_handle();
        Ok(Self {
            conn: Mutex::new(conn),
            interrupt_handle,
        })
    }

    /// Open an in-memory database, primarily for tests.
    pub fn open_in_memory() -> Result<Self, PatchKitError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let interrupt_handle = conn.get_interrupt_handle();
        Ok(Self {
            conn: Mutex::new(conn),
            interrupt_handle,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn bind_values(args: &[SqlArg]) -> Vec<RusqliteValue> {
    args.iter()
        .map(|a| match a.to_scalar() {
            SqlScalar::Null => RusqliteValue::Null,
            SqlScalar::Int64(v) => RusqliteValue::Integer(v),
            SqlScalar::Real(v) => RusqliteValue::Real(v),
            SqlScalar::Text(v) => RusqliteValue::Text(v),
            SqlScalar::Blob(v) => RusqliteValue::Blob(v),
        })
        .collect()
}

fn value_ref_to_scalar(value: ValueRef<'_>) -> SqlScalar {
    match value {
        ValueRef::Null => SqlScalar::Null,
        ValueRef::Integer(v) => SqlScalar::Int64(v),
        ValueRef::Real(v) => SqlScalar::Real(v),
        ValueRef::Text(v) => SqlScalar::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => SqlScalar::Blob(v.to_vec()),
    }
}

impl Engine for SqliteEngine {
    fn query_scalar(&self, sql: &str, args: &[SqlArg]) -> Result<SqlScalar, PatchKitError> {
        let conn = self.lock();
        let values = bind_values(args);
        let mut stmt = conn.prepare(sql)?;
        let result = stmt
            .query_row(rusqlite::params_from_iter(values.iter()), |row| {
                Ok(value_ref_to_scalar(row.get_ref(0)?))
            })
            .optional()?;
        Ok(result.unwrap_or(SqlScalar::Null))
    }

    fn execute(&self, sql: &str, args: &[SqlArg]) -> Result<i32, PatchKitError> {
        let conn = self.lock();
        let values = bind_values(args);
        let changed = conn.execute(sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(changed as i32)
    }

    fn in_transaction(
        &self,
        immediate: bool,
        f: &mut dyn FnMut(&dyn Engine) -> Result<(), PatchKitError>,
    ) -> Result<(), PatchKitError> {
        {
            let conn = self.lock();
            let begin_sql = if immediate { "BEGIN IMMEDIATE" } else { "BEGIN" };
            conn.execute(begin_sql, [])?;
        }

        match f(self) {
            Ok(()) => {
                self.lock().execute("COMMIT", [])?;
                Ok(())
            }
            Err(e) => {
                // Rollback on any error unwinding out of the closure so the
                // transaction never leaks open; the original error is what
                // the caller sees, not a rollback failure (best effort).
                let _ = self.lock().execute("ROLLBACK", []);
                Err(e)
            }
        }
    }

    fn interrupt(&self) {
        self.interrupt_handle.interrupt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_and_query_scalar_round_trip() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", &[])
            .unwrap();
        let changed = engine
            .execute(
                "INSERT INTO t (id, name) VALUES (?, ?)",
                &[SqlArg::Int64 { v: 1 }, SqlArg::Text { v: "a".to_string() }],
            )
            .unwrap();
        assert_eq!(changed, 1);

        let count = engine.query_scalar("SELECT COUNT(*) FROM t", &[]).unwrap();
        assert_eq!(count.as_long(), 1);
    }

    #[test]
    fn query_scalar_on_empty_result_is_null() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine.execute("CREATE TABLE t (id INTEGER)", &[]).unwrap();
        let result = engine
            .query_scalar("SELECT id FROM t WHERE id = 999", &[])
            .unwrap();
        assert_eq!(result, SqlScalar::Null);
    }

    #[test]
    fn in_transaction_commits_on_success() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine.execute("CREATE TABLE t (id INTEGER)", &[]).unwrap();
        engine
            .in_transaction(true, &mut |e| {
                e.execute("INSERT INTO t (id) VALUES (1)", &[])?;
                Ok(())
            })
            .unwrap();

        let count = engine.query_scalar("SELECT COUNT(*) FROM t", &[]).unwrap();
        assert_eq!(count.as_long(), 1);
    }

    #[test]
    fn in_transaction_rolls_back_on_error() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine.execute("CREATE TABLE t (id INTEGER)", &[]).unwrap();
        let result = engine.in_transaction(true, &mut |e| {
            e.execute("INSERT INTO t (id) VALUES (1)", &[])?;
            Err(PatchKitError::ActionFailed("boom".to_string()))
        });
        assert!(result.is_err());

        let count = engine.query_scalar("SELECT COUNT(*) FROM t", &[]).unwrap();
        assert_eq!(count.as_long(), 0);
    }

    #[test]
    fn nested_in_transaction_is_rejected_by_sqlite() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let result = engine.in_transaction(true, &mut |e| {
            e.in_transaction(true, &mut |_| Ok(()))
        });
        assert!(result.is_err());
    }
}
