//! Canonical error type for all patchkit operations.
//!
//! `PatchKitError` covers every failure kind spec'd for the library: the
//! eight to nine "error kinds" the orchestrator and executor can raise
//! internally, plus `#[from]` conversions for the leaf library errors
//! (`rusqlite`, `serde_json`, `std::io`). Nothing in the core escapes
//! `PatchKit::apply` as an unhandled error — every variant here ends up
//! folded into a terminal `ExecutionEvent` by the orchestrator or executor,
//! never propagated to the caller as a panic or bare `Result::Err` from
//! `apply` itself.

use thiserror::Error;

use crate::core::validate::ValidationCode;

/// Canonical error type for all patchkit operations.
#[derive(Error, Debug)]
pub enum PatchKitError {
    /// Raw bytes could not be parsed as a valid `Patch` (malformed JSON,
    /// unknown key, bad discriminator, or a constructor guard violation
    /// such as `version != 1`).
    #[error("failed to parse patch: {0}")]
    Parse(String),

    /// A validator in the chain rejected the patch before execution began.
    #[error("validation failed: {code:?}: {message}")]
    Validation { code: ValidationCode, message: String },

    /// `patch.target` has no registered engine provider.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// A precondition did not hold.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// A postcondition did not hold after commit.
    #[error("postcondition failed: {0}")]
    PostconditionFailed(String),

    /// An action failed to execute inside the write transaction.
    #[error("action failed: {0}")]
    ActionFailed(String),

    /// A per-action or total deadline elapsed.
    #[error("timeout exceeded: {0}")]
    TimeoutExceeded(String),

    /// The idempotency ledger failed to initialize, query, or record.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// A generic engine-level failure not covered by a more specific kind.
    #[error("engine error: {0}")]
    Engine(String),

    /// SQLite error surfaced by the bundled engine (auto-converts).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON (de)serialization error (auto-converts).
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error from the `fs` collaborator module (auto-converts).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PatchKitError {
    /// Stable, short name for `detail["exception"]` in terminal events.
    /// Not derived via `Display` because the human message is allowed to
    /// change; this name is part of the audit contract and must not.
    pub fn exception_kind(&self) -> &'static str {
        match self {
            PatchKitError::Parse(_) => "ParseError",
            PatchKitError::Validation { .. } => "ValidationError",
            PatchKitError::UnknownTarget(_) => "UnknownTarget",
            PatchKitError::PreconditionFailed(_) => "PreconditionFailed",
            PatchKitError::PostconditionFailed(_) => "PostconditionFailed",
            PatchKitError::ActionFailed(_) => "ActionFailed",
            PatchKitError::TimeoutExceeded(_) => "TimeoutExceeded",
            PatchKitError::Ledger(_) => "LedgerError",
            PatchKitError::Engine(_) => "EngineError",
            PatchKitError::Sqlite(_) => "EngineError",
            PatchKitError::Json(_) => "ParseError",
            PatchKitError::Io(_) => "EngineError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_kind_is_stable_for_validation() {
        let err = PatchKitError::Validation {
            code: ValidationCode::DdlNotAllowed,
            message: "no DDL".to_string(),
        };
        assert_eq!(err.exception_kind(), "ValidationError");
    }

    #[test]
    fn display_includes_message() {
        let err = PatchKitError::UnknownTarget("primary".to_string());
        assert_eq!(format!("{err}"), "unknown target: primary");
    }
}
