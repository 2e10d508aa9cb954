//! Idempotency ledger: tracks which patch ids have already been applied.
//!
//! The default table shape (`_patchkit_applied`, `patch_id` primary key,
//! `applied_at`, `metadata`) is grounded on the teacher's `core/schemas.rs`
//! convention of one `const &str` DDL statement per table, and its
//! id-keyed, idempotent-by-construction semantics are grounded on
//! `core/migration.rs`'s applied-migrations tracking (a `Migration.id`
//! that, once recorded, makes re-running that migration a no-op) —
//! generalized here from a compiled list of migrations to arbitrary
//! runtime patch ids supplied by the caller.

use crate::core::clock::Clock;
use crate::core::engine::Engine;
use crate::core::error::PatchKitError;
use crate::core::value::SqlArg;

/// Tracks applied patch ids so a patch runs at most once against a given
/// database.
pub trait Ledger: Send + Sync {
    /// Idempotent setup: create the ledger table/index if they don't exist.
    /// Must be safe to call on every `apply`, and must run outside the
    /// mutating write transaction.
    fn initialize(&self, engine: &dyn Engine) -> Result<(), PatchKitError>;

    /// True iff `patch_id` has a row in the ledger.
    fn has_been_applied(&self, patch_id: &str, engine: &dyn Engine) -> Result<bool, PatchKitError>;

    /// Record that `patch_id` was successfully applied. Called after the
    /// write transaction commits; a failure here does not undo the applied
    /// mutations (documented hazard, spec §9).
    fn record_application(
        &self,
        patch_id: &str,
        engine: &dyn Engine,
        metadata: &str,
    ) -> Result<(), PatchKitError>;
}

/// Default SQLite-backed ledger, storing applied patch ids in a single
/// table named `table_name` (default `_patchkit_applied`).
pub struct SqliteLedger {
    table_name: String,
    clock: Box<dyn Clock>,
}

impl SqliteLedger {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            table_name: "_patchkit_applied".to_string(),
            clock,
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    fn create_table_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (
                patch_id TEXT PRIMARY KEY,
                applied_at INTEGER NOT NULL,
                metadata TEXT
            )",
            self.table_name
        )
    }

    fn create_index_sql(&self) -> String {
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_patch_id ON {table} (patch_id)",
            table = self.table_name
        )
    }
}

impl Ledger for SqliteLedger {
    fn initialize(&self, engine: &dyn Engine) -> Result<(), PatchKitError> {
        engine.execute(&self.create_table_sql(), &[])?;
        engine.execute(&self.create_index_sql(), &[])?;
        Ok(())
    }

    fn has_been_applied(&self, patch_id: &str, engine: &dyn Engine) -> Result<bool, PatchKitError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE patch_id = ?", self.table_name);
        let count = engine.query_scalar(&sql, &[SqlArg::Text { v: patch_id.to_string() }])?;
        Ok(count.as_long() > 0)
    }

    fn record_application(
        &self,
        patch_id: &str,
        engine: &dyn Engine,
        metadata: &str,
    ) -> Result<(), PatchKitError> {
        let sql = format!(
            "INSERT INTO {} (patch_id, applied_at, metadata) VALUES (?, ?, ?)",
            self.table_name
        );
        engine.execute(
            &sql,
            &[
                SqlArg::Text { v: patch_id.to_string() },
                SqlArg::Int64 { v: self.clock.now_millis() },
                SqlArg::Text { v: metadata.to_string() },
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FrozenClock;
    use crate::core::sqlite::SqliteEngine;

    #[test]
    fn initialize_is_idempotent() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let ledger = SqliteLedger::new(Box::new(FrozenClock::starting_at(0)));
        ledger.initialize(&engine).unwrap();
        ledger.initialize(&engine).unwrap();
    }

    #[test]
    fn has_been_applied_reflects_record_application() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let ledger = SqliteLedger::new(Box::new(FrozenClock::starting_at(0)));
        ledger.initialize(&engine).unwrap();

        assert!(!ledger.has_been_applied("patch-1", &engine).unwrap());
        ledger
            .record_application("patch-1", &engine, "{}")
            .unwrap();
        assert!(ledger.has_been_applied("patch-1", &engine).unwrap());
        assert!(!ledger.has_been_applied("patch-2", &engine).unwrap());
    }

    #[test]
    fn duplicate_record_application_violates_unique_constraint() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let ledger = SqliteLedger::new(Box::new(FrozenClock::starting_at(0)));
        ledger.initialize(&engine).unwrap();
        ledger
            .record_application("patch-1", &engine, "{}")
            .unwrap();
        let result = ledger.record_application("patch-1", &engine, "{}");
        assert!(result.is_err());
    }

    #[test]
    fn custom_table_name_is_used() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let ledger =
            SqliteLedger::new(Box::new(FrozenClock::starting_at(0))).with_table_name("my_ledger");
        ledger.initialize(&engine).unwrap();
        let count = engine
            .query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='my_ledger'",
                &[],
            )
            .unwrap();
        assert_eq!(count.as_long(), 1);
    }
}
