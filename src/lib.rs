//! patchkit: transactional, idempotent application of declarative
//! JSON-encoded patches against a SQLite database.
//!
//! A **patch** bundles numeric guard queries (preconditions/postconditions)
//! and parameterized SQL mutations (actions) under a stable id. `PatchKit`
//! decides whether to run a patch, runs it atomically, and returns a
//! detailed, timestamped audit timeline — never an error: every outcome,
//! success or failure, is an [`ExecutionReport`](core::report::ExecutionReport).
//!
//! ```no_run
//! use std::sync::Arc;
//! use patchkit::core::config::PatchKitConfig;
//! use patchkit::core::engine::{Engine, EngineRegistry};
//! use patchkit::core::orchestrator::PatchKit;
//! use patchkit::core::sqlite::SqliteEngine;
//!
//! let engine = Arc::new(SqliteEngine::open("app.db").unwrap());
//! let registry = EngineRegistry::new().register(
//!     "primary",
//!     Box::new(move || Ok(engine.clone() as Arc<dyn Engine>)),
//! );
//! let kit = PatchKit::new(registry, PatchKitConfig::default());
//! let report = kit.apply(br#"{"version":1,"id":"p1","target":"primary"}"#);
//! assert!(report.success());
//! ```
//!
//! # Scope
//!
//! The core implemented here is the patch-application engine: the
//! orchestrator, the transactional executor, the validator chain, the
//! idempotency ledger, the tagged SQL-value/action model and its wire
//! codec, and the engine abstraction that isolates SQLite specifics.
//! Out of scope (collaborators, not core): the physical SQLite driver
//! (reached only through the `Engine` trait), filesystem helpers
//! (`core::fs`), and human-readable report rendering
//! (`core::report::render_text`).

pub mod core;

pub use crate::core::action::{Action, ComparisonOperator, Condition, Patch};
pub use crate::core::config::PatchKitConfig;
pub use crate::core::engine::{Engine, EngineProvider, EngineRegistry};
pub use crate::core::error::PatchKitError;
pub use crate::core::ledger::{Ledger, SqliteLedger};
pub use crate::core::orchestrator::PatchKit;
pub use crate::core::report::{EventCode, ExecutionEvent, ExecutionReport};
pub use crate::core::sqlite::SqliteEngine;
pub use crate::core::value::{SqlArg, SqlScalar};
