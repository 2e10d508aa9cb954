//! The engine abstraction that isolates SQLite specifics from the executor.
//!
//! Three operations (`query_scalar`, `execute`, `in_transaction`) plus an
//! `interrupt` hook used for cooperative timeout cancellation. Transactions
//! are not reentrant: calling `in_transaction` from within the closure
//! passed to an outer `in_transaction` call is a contract violation, and the
//! concrete SQLite implementation (`crate::core::sqlite::SqliteEngine`)
//! naturally rejects it (SQLite itself errors on `BEGIN` inside a
//! transaction). `Registry` generalizes the teacher's fixed
//! subsystem-database list (`core/mod.rs`'s "Subsystems own their schemas")
//! into a caller-supplied map of target alias → cold-until-first-use engine
//! provider, per spec §4.2.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::error::PatchKitError;
use crate::core::value::SqlArg;

/// Abstraction over a single SQLite connection's mutating and read
/// operations, plus transaction scoping.
pub trait Engine: Send + Sync {
    /// Run a query and return the first column of the first row, or
    /// `SqlScalar::Null` if the statement yields no rows.
    fn query_scalar(&self, sql: &str, args: &[SqlArg]) -> Result<crate::core::value::SqlScalar, PatchKitError>;

    /// Run a single DML/DDL statement and return SQLite `changes()` for it.
    fn execute(&self, sql: &str, args: &[SqlArg]) -> Result<i32, PatchKitError>;

    /// Open `BEGIN IMMEDIATE` (when `immediate`) or `BEGIN` (deferred); on
    /// normal return of `f`, `COMMIT`; on any error, `ROLLBACK` and
    /// propagate the error.
    fn in_transaction(
        &self,
        immediate: bool,
        f: &mut dyn FnMut(&dyn Engine) -> Result<(), PatchKitError>,
    ) -> Result<(), PatchKitError>;

    /// Cooperatively abort the statement currently in flight on this
    /// engine, if any. Called by the executor's timeout wrapper; engines
    /// that cannot interrupt a native call must still implement this as a
    /// best-effort no-op, but then the enclosing timeout cannot actually
    /// bound that call (documented hazard, spec §9).
    fn interrupt(&self);
}

/// A zero-argument factory for an `Engine`, invoked lazily the first time
/// its target alias is referenced by an applied patch. Factories may return
/// a cached engine instance on repeat calls.
pub type EngineProvider = Box<dyn Fn() -> Result<Arc<dyn Engine>, PatchKitError> + Send + Sync>;

/// Maps a patch's `target` string to the engine that should run it.
#[derive(Default)]
pub struct EngineRegistry {
    providers: HashMap<String, EngineProvider>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for `target`. Replaces any existing provider for
    /// the same alias.
    pub fn register(mut self, target: impl Into<String>, provider: EngineProvider) -> Self {
        self.providers.insert(target.into(), provider);
        self
    }

    /// Resolve `target` to an engine instance, invoking its provider.
    pub fn resolve(&self, target: &str) -> Result<Arc<dyn Engine>, PatchKitError> {
        let provider = self
            .providers
            .get(target)
            .ok_or_else(|| PatchKitError::UnknownTarget(target.to_string()))?;
        provider()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::SqlScalar;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        calls: AtomicUsize,
    }

    impl Engine for CountingEngine {
        fn query_scalar(&self, _sql: &str, _args: &[SqlArg]) -> Result<SqlScalar, PatchKitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SqlScalar::Null)
        }
        fn execute(&self, _sql: &str, _args: &[SqlArg]) -> Result<i32, PatchKitError> {
            Ok(0)
        }
        fn in_transaction(
            &self,
            _immediate: bool,
            f: &mut dyn FnMut(&dyn Engine) -> Result<(), PatchKitError>,
        ) -> Result<(), PatchKitError> {
            f(self)
        }
        fn interrupt(&self) {}
    }

    #[test]
    fn resolve_missing_target_is_unknown_target_error() {
        let registry = EngineRegistry::new();
        let err = registry.resolve("primary").unwrap_err();
        assert!(matches!(err, PatchKitError::UnknownTarget(t) if t == "primary"));
    }

    #[test]
    fn resolve_invokes_provider_and_can_be_called_repeatedly() {
        let registry = EngineRegistry::new().register(
            "primary",
            Box::new(|| {
                Ok(Arc::new(CountingEngine {
                    calls: AtomicUsize::new(0),
                }) as Arc<dyn Engine>)
            }),
        );
        let engine = registry.resolve("primary").unwrap();
        engine.query_scalar("SELECT 1", &[]).unwrap();
        let engine_again = registry.resolve("primary").unwrap();
        engine_again.query_scalar("SELECT 1", &[]).unwrap();
    }
}
